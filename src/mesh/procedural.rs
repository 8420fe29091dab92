//! Basic procedural mesh generation routines.
use crate::cell::CellType;
use crate::mesh::Mesh;

fn build(cell_type: CellType, geometric_dim: usize, coordinates: Vec<f64>, cells: Vec<usize>) -> Mesh {
    Mesh::from_vertices_and_cells(cell_type, geometric_dim, coordinates, cells)
        .expect("procedural meshes are valid by construction")
}

/// Uniform mesh of `[x0, x1]` with `n` cells.
pub fn interval(x0: f64, x1: f64, n: usize) -> Mesh {
    let h = (x1 - x0) / n as f64;
    let coordinates = (0..=n).map(|i| x0 + i as f64 * h).collect();
    let cells = (0..n).flat_map(|i| [i, i + 1]).collect();
    build(CellType::Interval, 1, coordinates, cells)
}

pub fn unit_interval(n: usize) -> Mesh {
    interval(0.0, 1.0, n)
}

/// Uniform triangle mesh of `[x0, x1] x [y0, y1]` with `nx x ny` squares, each split into two
/// triangles along the diagonal from its lower left to its upper right corner.
pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64, nx: usize, ny: usize) -> Mesh {
    let hx = (x1 - x0) / nx as f64;
    let hy = (y1 - y0) / ny as f64;
    let to_global_vertex_index = |i: usize, j: usize| (nx + 1) * j + i;

    let mut coordinates = Vec::with_capacity(2 * (nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            coordinates.push(x0 + i as f64 * hx);
            coordinates.push(y0 + j as f64 * hy);
        }
    }

    let mut cells = Vec::with_capacity(6 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v0 = to_global_vertex_index(i, j);
            let v1 = to_global_vertex_index(i + 1, j);
            let v2 = to_global_vertex_index(i, j + 1);
            let v3 = to_global_vertex_index(i + 1, j + 1);
            cells.extend_from_slice(&[v0, v1, v3]);
            cells.extend_from_slice(&[v0, v2, v3]);
        }
    }
    build(CellType::Triangle, 2, coordinates, cells)
}

pub fn unit_square(nx: usize, ny: usize) -> Mesh {
    rectangle(0.0, 0.0, 1.0, 1.0, nx, ny)
}

/// Uniform tetrahedral mesh of the box spanned by `p0` and `p1`, with `nx x ny x nz` cubes each
/// split into six tetrahedra sharing the cube's main diagonal.
pub fn box_mesh(p0: [f64; 3], p1: [f64; 3], nx: usize, ny: usize, nz: usize) -> Mesh {
    let h = [
        (p1[0] - p0[0]) / nx as f64,
        (p1[1] - p0[1]) / ny as f64,
        (p1[2] - p0[2]) / nz as f64,
    ];
    let to_global_vertex_index = |i: usize, j: usize, k: usize| ((ny + 1) * k + j) * (nx + 1) + i;

    let mut coordinates = Vec::with_capacity(3 * (nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                coordinates.push(p0[0] + i as f64 * h[0]);
                coordinates.push(p0[1] + j as f64 * h[1]);
                coordinates.push(p0[2] + k as f64 * h[2]);
            }
        }
    }

    let mut cells = Vec::with_capacity(24 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let v0 = to_global_vertex_index(i, j, k);
                let v1 = to_global_vertex_index(i + 1, j, k);
                let v2 = to_global_vertex_index(i, j + 1, k);
                let v3 = to_global_vertex_index(i + 1, j + 1, k);
                let v4 = to_global_vertex_index(i, j, k + 1);
                let v5 = to_global_vertex_index(i + 1, j, k + 1);
                let v6 = to_global_vertex_index(i, j + 1, k + 1);
                let v7 = to_global_vertex_index(i + 1, j + 1, k + 1);
                cells.extend_from_slice(&[v0, v1, v3, v7]);
                cells.extend_from_slice(&[v0, v1, v7, v5]);
                cells.extend_from_slice(&[v0, v5, v7, v4]);
                cells.extend_from_slice(&[v0, v3, v2, v7]);
                cells.extend_from_slice(&[v0, v6, v4, v7]);
                cells.extend_from_slice(&[v0, v2, v6, v7]);
            }
        }
    }
    build(CellType::Tetrahedron, 3, coordinates, cells)
}

pub fn unit_cube(nx: usize, ny: usize, nz: usize) -> Mesh {
    box_mesh([0.0; 3], [1.0; 3], nx, ny, nz)
}
