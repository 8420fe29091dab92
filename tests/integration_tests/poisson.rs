use galerkin::assembly::{assemble_matrix, assemble_system, assemble_vector, Assembler, BoundarySelection, DirichletBc};
use galerkin::cell::CellType;
use galerkin::element::LagrangeElement;
use galerkin::form::{LaplaceForm, MassForm, SourceForm};
use galerkin::mesh::procedural::unit_square;
use galerkin::sparse::{gmres, DiagonalPreconditioner, GmresSettings};
use matrixcompare::assert_scalar_eq;
use nalgebra::DVector;

fn solver_settings() -> GmresSettings {
    GmresSettings {
        restart: 100,
        max_iterations: 10_000,
        relative_tolerance: 1e-12,
        absolute_tolerance: 1e-14,
    }
}

#[test]
fn l2_projection_preserves_the_norm() {
    let mesh = unit_square(16, 16);
    let element = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let mass = assemble_matrix(&MassForm::new(element.clone()).unwrap(), &mesh).unwrap();
    let stiffness = assemble_matrix(&LaplaceForm::new(element.clone()).unwrap(), &mesh).unwrap();
    let load = assemble_vector(&SourceForm::new(element, |x| x[0].sin() + x[1].cos()).unwrap(), &mesh).unwrap();

    let mut v = DVector::zeros(load.len());
    let preconditioner = DiagonalPreconditioner::from_csr(&mass);
    gmres(&mass, &mut v, &load, &preconditioner, &solver_settings()).unwrap();

    let sin1 = 1.0f64.sin();
    let cos1 = 1.0f64.cos();
    // ∫ f² and ∫ |∇f|² over the unit square
    let l2_squared = 1.0 + 2.0 * sin1 * (1.0 - cos1);
    let h1_squared = 1.0;
    assert_scalar_eq!(v.dot(&(&mass * &v)), l2_squared, comp = abs, tol = 1e-4);
    assert_scalar_eq!(v.dot(&(&stiffness * &v)), h1_squared, comp = abs, tol = 5e-2);
}

#[test]
fn quadratic_elements_solve_a_quadratic_poisson_problem_exactly() {
    let exact = |x: &[f64]| 1.0 + x[0] * x[0] + 2.0 * x[1] * x[1];
    let mesh = unit_square(6, 5);
    let element = LagrangeElement::new(CellType::Triangle, 2).unwrap();
    let a = LaplaceForm::new(element.clone()).unwrap();
    let l = SourceForm::new(element, |_| -6.0).unwrap();
    let bc = DirichletBc::new(exact, BoundarySelection::OnBoundary);
    let (matrix, rhs) = assemble_system(&a, &l, &mesh, &[&bc]).unwrap();

    let mut u = DVector::zeros(rhs.len());
    let preconditioner = DiagonalPreconditioner::from_csr(&matrix);
    let output = gmres(&matrix, &mut u, &rhs, &preconditioner, &solver_settings()).unwrap();
    assert!(output.num_iterations > 0);

    let dofmaps = Assembler::new().dofmaps(&a, &mesh).unwrap();
    let dofmap = &dofmaps[1];
    for cell in 0..mesh.num_cells() {
        let coordinates = dofmap.tabulate_coordinates(cell, &mesh);
        for (local, &dof) in dofmap.tabulate_dofs(cell).iter().enumerate() {
            let x: Vec<f64> = coordinates.row(local).iter().copied().collect();
            assert_scalar_eq!(u[dof], exact(&x), comp = abs, tol = 1e-8);
        }
    }
}
