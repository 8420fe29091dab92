use galerkin::cell::CellType;
use galerkin::element::LagrangeElement;
use galerkin::error::FemError;
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

const CELL_TYPES: [CellType; 3] = [CellType::Interval, CellType::Triangle, CellType::Tetrahedron];

#[test]
fn basis_is_nodal() {
    for cell_type in CELL_TYPES {
        for degree in 0..=2 {
            let element = LagrangeElement::new(cell_type, degree).unwrap();
            let nodes = element.reference_dof_coordinates();
            for j in 0..nodes.nrows() {
                let xi: Vec<f64> = nodes.row(j).iter().copied().collect();
                let values = element.evaluate_basis(&xi, 0);
                for i in 0..element.scalar_dimension() {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert_scalar_eq!(values[(i, 0)], expected, comp = abs, tol = 1e-14);
                }
            }
        }
    }
}

#[test]
fn derivatives_above_the_degree_vanish() {
    let element = LagrangeElement::new(CellType::Triangle, 2).unwrap();
    let hessians = element.evaluate_basis(&[0.2, 0.3], 2);
    assert_eq!(hessians.ncols(), 4);
    let third = element.evaluate_basis(&[0.2, 0.3], 3);
    assert!(third.iter().all(|&d| d == 0.0));
    // Hessians are symmetric
    for i in 0..hessians.nrows() {
        assert_scalar_eq!(hessians[(i, 1)], hessians[(i, 2)], comp = abs, tol = 1e-14);
    }
}

#[test]
fn high_degrees_are_unsupported() {
    let result = LagrangeElement::new(CellType::Triangle, 3);
    assert!(matches!(result, Err(FemError::UnsupportedElement(_))));
    let result = LagrangeElement::vector(CellType::Triangle, 1, 0);
    assert!(matches!(result, Err(FemError::UnsupportedElement(_))));
}

#[test]
fn signatures_distinguish_elements() {
    let p1 = LagrangeElement::new(CellType::Triangle, 1).unwrap();
    let p2 = LagrangeElement::new(CellType::Triangle, 2).unwrap();
    let v1 = LagrangeElement::vector(CellType::Triangle, 1, 2).unwrap();
    assert_ne!(p1.signature(), p2.signature());
    assert_ne!(p1.signature(), v1.signature());
    assert_eq!(v1.space_dimension(), 6);
}

fn reference_point(cell_type: CellType) -> impl Strategy<Value = Vec<f64>> {
    let dim = cell_type.dim();
    proptest::collection::vec(0.0..1.0f64, dim).prop_map(|mut xi| {
        // Scale into the reference simplex
        let sum: f64 = xi.iter().sum();
        if sum > 1.0 {
            xi.iter_mut().for_each(|x| *x /= sum + 0.1);
        }
        xi
    })
}

proptest! {
    #[test]
    fn basis_is_a_partition_of_unity(
        (cell_type, xi) in prop_oneof![Just(CellType::Interval), Just(CellType::Triangle), Just(CellType::Tetrahedron)]
            .prop_flat_map(|cell_type| (Just(cell_type), reference_point(cell_type))),
        degree in 0usize..=2
    ) {
        let element = LagrangeElement::new(cell_type, degree).unwrap();
        let values = element.evaluate_basis(&xi, 0);
        assert_scalar_eq!(values.sum(), 1.0, comp = abs, tol = 1e-13);

        let gradients = element.evaluate_basis(&xi, 1);
        for k in 0..cell_type.dim() {
            assert_scalar_eq!(gradients.column(k).sum(), 0.0, comp = abs, tol = 1e-12);
        }
    }
}
