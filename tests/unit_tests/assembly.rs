use eyre::eyre;
use galerkin::assembly::{
    assemble_matrix, assemble_scalar, assemble_system, assemble_vector, build_sparsity_pattern, Assembler,
    BoundaryCondition, BoundarySelection, DirichletBc, SubDomains,
};
use galerkin::cell::CellType;
use galerkin::dofmap::DofMap;
use galerkin::element::LagrangeElement;
use galerkin::error::FemError;
use galerkin::form::{
    BoundaryMassForm, BoundarySourceForm, Form, IntegralFunctional, JumpPenaltyForm, LaplaceForm, MassForm,
    SourceForm,
};
use galerkin::geometry::CellGeometry;
use galerkin::mesh::procedural::{unit_cube, unit_interval, unit_square};
use galerkin::mesh::{Mesh, MeshFunction};
use galerkin::sparse::{CsrMatrix, Scalar};
use matrixcompare::assert_scalar_eq;
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;

/// Coordinates of every global dof.
fn dof_coordinates(dofmap: &DofMap, mesh: &Mesh) -> Vec<Vec<f64>> {
    let mut coordinates = vec![Vec::new(); dofmap.global_dimension()];
    for cell in 0..mesh.num_cells() {
        let x = dofmap.tabulate_coordinates(cell, mesh);
        for (local, &dof) in dofmap.tabulate_dofs(cell).iter().enumerate() {
            coordinates[dof] = x.row(local).iter().copied().collect();
        }
    }
    coordinates
}

fn quadratic_form(matrix: &CsrMatrix<f64>, v: &DVector<f64>) -> f64 {
    v.dot(&(matrix * v))
}

#[test]
fn mass_matrix_integrates_constants() {
    for degree in 0..=2 {
        let element = LagrangeElement::new(CellType::Triangle, degree).unwrap();
        let mesh = unit_square(3, 4);
        let mass = assemble_matrix(&MassForm::new(element).unwrap(), &mesh).unwrap();
        let ones = DVector::repeat(mass.ncols(), 1.0);
        assert_scalar_eq!(quadratic_form(&mass, &ones), 1.0, comp = abs, tol = 1e-12);
    }

    let element = LagrangeElement::new(CellType::Tetrahedron, 2).unwrap();
    let mesh = unit_cube(2, 1, 1);
    let mass = assemble_matrix(&MassForm::with_density(element, 3.0).unwrap(), &mesh).unwrap();
    let ones = DVector::repeat(mass.ncols(), 1.0);
    assert_scalar_eq!(quadratic_form(&mass, &ones), 3.0, comp = abs, tol = 1e-12);
}

#[test]
fn stiffness_matrix_integrates_linear_gradients() {
    let mesh = unit_square(4, 3);
    let assembler = Assembler::new();
    for degree in 1..=2 {
        let element = LagrangeElement::new(CellType::Triangle, degree).unwrap();
        let form = LaplaceForm::new(element).unwrap();
        let mut stiffness = CsrMatrix::zeros(0, 0);
        assembler.assemble(&mut stiffness, &form, &mesh).unwrap();

        // Constants are in the kernel
        let ones = DVector::repeat(stiffness.ncols(), 1.0);
        let kernel = &stiffness * &ones;
        assert!(kernel.amax() < 1e-12);

        // u = 2x + y has energy ∫ |∇u|² = 5
        let dofmaps = assembler.dofmaps(&form, &mesh).unwrap();
        let x = dof_coordinates(&dofmaps[1], &mesh);
        let u = DVector::from_iterator(x.len(), x.iter().map(|x| 2.0 * x[0] + x[1]));
        assert_scalar_eq!(quadratic_form(&stiffness, &u), 5.0, comp = abs, tol = 1e-11);
    }
}

#[test]
fn load_vector_integrates_the_source() {
    let mesh = unit_square(8, 8);
    let element = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let load = assemble_vector(&SourceForm::new(element, |x| x[0] * x[1]).unwrap(), &mesh).unwrap();
    // The P1 basis sums to one
    assert_scalar_eq!(load.sum(), 0.25, comp = abs, tol = 1e-12);

    let vector_element = LagrangeElement::vector(CellType::Triangle, 1, 2).unwrap();
    let load = assemble_vector(&SourceForm::new(vector_element, |_| 1.0).unwrap(), &mesh).unwrap();
    assert_scalar_eq!(load.sum(), 2.0, comp = abs, tol = 1e-12);
}

#[test]
fn functionals_integrate_over_the_domain() {
    let mesh = unit_square(5, 5);
    let volume = assemble_scalar(&IntegralFunctional::volume(CellType::Triangle).unwrap(), &mesh).unwrap();
    assert_scalar_eq!(volume, 1.0, comp = abs, tol = 1e-13);

    let functional = IntegralFunctional::new(CellType::Triangle, 2, |x| x[0] * x[0]).unwrap();
    assert_scalar_eq!(assemble_scalar(&functional, &mesh).unwrap(), 1.0 / 3.0, comp = abs, tol = 1e-13);

    let mesh = unit_interval(7);
    let functional = IntegralFunctional::new(CellType::Interval, 3, |x| x[0].powi(3)).unwrap();
    assert_scalar_eq!(assemble_scalar(&functional, &mesh).unwrap(), 0.25, comp = abs, tol = 1e-13);
}

#[test]
fn boundary_forms_integrate_over_the_boundary() {
    let mesh = unit_square(3, 5);
    let element = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let boundary_mass = assemble_matrix(&BoundaryMassForm::new(element, 2.0).unwrap(), &mesh).unwrap();
    let ones = DVector::repeat(boundary_mass.ncols(), 1.0);
    assert_scalar_eq!(quadratic_form(&boundary_mass, &ones), 8.0, comp = abs, tol = 1e-12);

    let boundary_load = assemble_vector(&BoundarySourceForm::new(element, |x| x[0]).unwrap(), &mesh).unwrap();
    // ∫ x ds over the unit square boundary
    assert_scalar_eq!(boundary_load.sum(), 2.0, comp = abs, tol = 1e-12);
}

#[test]
fn sub_domains_restrict_integration() {
    let mesh = unit_square(4, 4);
    let mut cell_markers = MeshFunction::new(&mesh, 2, 0);
    cell_markers.mark(&mesh, |x| x[0] < 0.5, 1);
    let mut facet_markers = MeshFunction::new(&mesh, 1, 0);
    facet_markers.mark(&mesh, |x| x[1] < 1e-12, 3);

    let assembler = Assembler::new();
    let subdomains = SubDomains {
        cells: Some((&cell_markers, 1)),
        ..SubDomains::default()
    };
    let mut volume = Scalar::new();
    let form = IntegralFunctional::volume(CellType::Triangle).unwrap();
    assembler
        .assemble_with_subdomains(&mut volume, &form, &mesh, &subdomains)
        .unwrap();
    assert_scalar_eq!(volume.value(), 0.5, comp = abs, tol = 1e-13);

    let element = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let subdomains = SubDomains {
        exterior_facets: Some((&facet_markers, 3)),
        ..SubDomains::default()
    };
    let mut load = DVector::zeros(0);
    let form = BoundarySourceForm::new(element, |_| 1.0).unwrap();
    assembler
        .assemble_with_subdomains(&mut load, &form, &mesh, &subdomains)
        .unwrap();
    assert_scalar_eq!(load.sum(), 1.0, comp = abs, tol = 1e-13);

    // Markers on the wrong entities are rejected
    let subdomains = SubDomains {
        cells: Some((&facet_markers, 3)),
        ..SubDomains::default()
    };
    let form = IntegralFunctional::volume(CellType::Triangle).unwrap();
    let result = assembler.assemble_with_subdomains(&mut volume, &form, &mesh, &subdomains);
    assert!(matches!(result, Err(FemError::DimensionMismatch { .. })));
}

#[test]
fn jump_penalty_vanishes_for_continuous_elements() {
    let mesh = unit_square(3, 3);
    let element = LagrangeElement::new(CellType::Triangle, 2).unwrap();
    let jump = assemble_matrix(&JumpPenaltyForm::new(element, 1.0).unwrap(), &mesh).unwrap();
    assert!(jump.values().iter().all(|v| v.abs() < 1e-12));

    // Piecewise constants jump across every interior facet with a non-constant field
    let element = LagrangeElement::new(CellType::Triangle, 0).unwrap();
    let jump = assemble_matrix(&JumpPenaltyForm::new(element, 1.0).unwrap(), &mesh).unwrap();
    let ones = DVector::repeat(jump.ncols(), 1.0);
    assert!(quadratic_form(&jump, &ones).abs() < 1e-12);
    let alternating = DVector::from_fn(jump.ncols(), |i, _| i as f64);
    assert!(quadratic_form(&jump, &alternating) > 0.0);
}

#[test]
fn assembly_is_deterministic() {
    let mesh = unit_square(6, 5);
    let element = LagrangeElement::new(CellType::Triangle, 2).unwrap();
    let form = LaplaceForm::with_conductivity(element, 0.3).unwrap();
    let first = assemble_matrix(&form, &mesh).unwrap();
    let second = assemble_matrix(&form, &mesh).unwrap();
    assert_eq!(first.pattern(), second.pattern());
    let bits = |m: &CsrMatrix<f64>| m.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn dense_and_sparse_assembly_agree() {
    let mesh = unit_cube(1, 2, 1);
    let element = LagrangeElement::new(CellType::Tetrahedron, 1).unwrap();
    let form = MassForm::new(element).unwrap();
    let sparse = assemble_matrix(&form, &mesh).unwrap();
    let mut dense = DMatrix::zeros(0, 0);
    Assembler::new().assemble(&mut dense, &form, &mesh).unwrap();
    assert_eq!(DMatrix::from(&sparse), dense);
}

#[test]
fn rank_mismatch_is_reported() {
    let mesh = unit_square(2, 2);
    let element = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let mut vector = DVector::zeros(0);
    let result = Assembler::new().assemble(&mut vector, &MassForm::new(element).unwrap(), &mesh);
    assert!(matches!(result, Err(FemError::DimensionMismatch { .. })));
}

#[test]
fn element_on_the_wrong_cell_type_is_unsupported() {
    let mesh = unit_square(2, 2);
    let element = LagrangeElement::new(CellType::Tetrahedron, 1).unwrap();
    let result = assemble_matrix(&MassForm::new(element).unwrap(), &mesh);
    assert!(matches!(result, Err(FemError::UnsupportedElement(_))));
}

#[test]
fn kernel_errors_are_propagated() {
    let mesh = unit_square(2, 2);
    let element = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let form = SourceForm::new(element, |x| if x[0] > 0.5 { f64::NAN } else { 1.0 }).unwrap();
    let result = assemble_vector(&form, &mesh);
    assert!(matches!(result, Err(FemError::FormEvaluation(_))));
}

/// A load form whose kernel always fails.
#[derive(Debug)]
struct FailingForm {
    elements: [LagrangeElement; 1],
}

impl Form for FailingForm {
    fn rank(&self) -> usize {
        1
    }

    fn signature(&self) -> String {
        "FailingForm".to_string()
    }

    fn elements(&self) -> &[LagrangeElement] {
        &self.elements
    }

    fn tabulate_cell(&self, _block: &mut [f64], cell: &CellGeometry) -> eyre::Result<()> {
        Err(eyre!("kernel failed on cell {}", cell.index()))
    }
}

#[test]
fn custom_form_errors_keep_their_message() {
    let mesh = unit_interval(3);
    let form = FailingForm {
        elements: [LagrangeElement::new(CellType::Interval, 1).unwrap()],
    };
    match assemble_vector(&form, &mesh) {
        Err(FemError::FormEvaluation(report)) => assert!(report.to_string().contains("cell 0")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn dirichlet_conditions_reproduce_harmonic_functions() {
    let mesh = unit_square(4, 4);
    let linear: fn(&[f64]) -> f64 = |x| 1.0 + 2.0 * x[0] - x[1];
    let quadratic: fn(&[f64]) -> f64 = |x| x[0] * x[0] - x[1] * x[1];
    for (degree, g) in [(1, linear), (2, quadratic)] {
        let element = LagrangeElement::new(CellType::Triangle, degree).unwrap();
        let a = LaplaceForm::new(element).unwrap();
        let l = SourceForm::new(element, |_| 0.0).unwrap();
        let bc = DirichletBc::new(g, BoundarySelection::OnBoundary);
        let (matrix, rhs) = assemble_system(&a, &l, &mesh, &[&bc]).unwrap();

        // Symmetric elimination keeps the matrix symmetric
        let dense = DMatrix::from(&matrix);
        assert!((&dense - dense.transpose()).amax() < 1e-12);

        let u = dense.lu().solve(&rhs).unwrap();
        let dofmaps = Assembler::new().dofmaps(&a, &mesh).unwrap();
        for (dof, x) in dof_coordinates(&dofmaps[1], &mesh).iter().enumerate() {
            assert_scalar_eq!(u[dof], g(x), comp = abs, tol = 1e-10);
        }
    }
}

#[test]
fn boundary_condition_trait_sets_identity_rows() {
    let mesh = unit_square(2, 2);
    let element = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let form = LaplaceForm::new(element).unwrap();
    let assembler = Assembler::new();
    let mut matrix = CsrMatrix::zeros(0, 0);
    assembler.assemble(&mut matrix, &form, &mesh).unwrap();
    let mut rhs = DVector::zeros(matrix.nrows());
    let dofmaps = assembler.dofmaps(&form, &mesh).unwrap();

    let bc = DirichletBc::new(|_| 4.0, BoundarySelection::Pointwise(Box::new(|x| x[0] < 1e-12)));
    bc.apply(&mut matrix, &mut rhs, &dofmaps[0], &mesh).unwrap();
    let boundary_values = bc.boundary_values(&dofmaps[0], &mesh).unwrap();
    assert_eq!(boundary_values.len(), 3);
    let dense = DMatrix::from(&matrix);
    for (&dof, &value) in &boundary_values {
        assert_eq!(value, 4.0);
        assert_eq!(rhs[dof], 4.0);
        for j in 0..dense.ncols() {
            assert_eq!(dense[(dof, j)], if j == dof { 1.0 } else { 0.0 });
        }
    }
}

#[test]
fn topological_conditions_use_facet_markers() {
    let mesh = unit_square(3, 3);
    let element = LagrangeElement::vector(CellType::Triangle, 2, 2).unwrap();
    let form = MassForm::new(element).unwrap();
    let dofmaps = Assembler::new().dofmaps(&form, &mesh).unwrap();
    let mut markers = MeshFunction::new(&mesh, 1, 0);
    markers.mark(&mesh, |x| x[1] > 1.0 - 1e-12, 7);

    let selection = BoundarySelection::Topological { markers, value: 7 };
    let bc = DirichletBc::homogeneous(selection).with_component(1);
    // 4 vertices and 3 edge midpoints on the top edge, second component only
    let values = bc.boundary_values(&dofmaps[0], &mesh).unwrap();
    assert_eq!(values.len(), 7);
    let scalar_dimension = dofmaps[0].global_dimension() / 2;
    assert!(values.keys().all(|&dof| dof >= scalar_dimension));

    let bc = DirichletBc::homogeneous(BoundarySelection::OnBoundary).with_component(2);
    assert!(matches!(
        bc.boundary_values(&dofmaps[0], &mesh),
        Err(FemError::DimensionMismatch { .. })
    ));
}

#[test]
fn non_finite_boundary_values_are_rejected() {
    let mesh = unit_square(2, 2);
    let element = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let dofmaps = Assembler::new()
        .dofmaps(&MassForm::new(element).unwrap(), &mesh)
        .unwrap();
    let bc = DirichletBc::new(|_| f64::INFINITY, BoundarySelection::OnBoundary);
    assert!(matches!(
        bc.boundary_values(&dofmaps[0], &mesh),
        Err(FemError::Consistency(_))
    ));
}

proptest! {
    #[test]
    fn sparsity_pattern_covers_assembled_entries(nx in 1usize..5, ny in 1usize..5, degree in 0usize..=2) {
        let mesh = unit_square(nx, ny);
        let element = LagrangeElement::new(CellType::Triangle, degree).unwrap();
        let form = LaplaceForm::new(element).unwrap();
        let jump = JumpPenaltyForm::new(element, 1.0).unwrap();
        let assembler = Assembler::new();

        for form in [&form as &dyn Form, &jump as &dyn Form] {
            let dofmaps = assembler.dofmaps(form, &mesh).unwrap();
            let pattern = build_sparsity_pattern(form, &dofmaps, &mesh, &SubDomains::default()).unwrap();
            let mut dense = DMatrix::zeros(0, 0);
            assembler.assemble(&mut dense, form, &mesh).unwrap();

            for i in 0..dense.nrows() {
                let lane = pattern.lane(i);
                prop_assert!(lane.contains(&i));
                for j in 0..dense.ncols() {
                    if dense[(i, j)] != 0.0 {
                        prop_assert!(lane.contains(&j));
                    }
                }
            }
        }
    }
}
