mod assembly;
mod dofmap;
mod element;
mod ode;
