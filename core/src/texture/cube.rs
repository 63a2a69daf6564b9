//! Cube map face selection and projection.

use crate::math::{Vec2, Vec3};

/// Cube map face, in GL face order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    NegativeX = 0,
    PositiveX = 1,
    NegativeY = 2,
    PositiveY = 3,
    NegativeZ = 4,
    PositiveZ = 5,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::NegativeX,
        CubeFace::PositiveX,
        CubeFace::NegativeY,
        CubeFace::PositiveY,
        CubeFace::NegativeZ,
        CubeFace::PositiveZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Index of the major axis (0 = X, 1 = Y, 2 = Z).
    pub fn axis(self) -> usize {
        self.index() / 2
    }

    pub fn is_positive(self) -> bool {
        self.index() % 2 == 1
    }

    fn from_axis(axis: usize, positive: bool) -> Self {
        Self::ALL[axis * 2 + usize::from(positive)]
    }
}

/// Face and face-local coordinates of a direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeFaceCoords {
    pub face: CubeFace,
    /// Face-local `(s, t)` in `[0, 1]`.
    pub st: Vec2,
}

/// Select the face a direction points at.
///
/// The axis with the strictly largest magnitude wins. Ties are broken
/// deterministically so any finite direction maps to exactly one face.
pub fn select_cube_face(coords: &Vec3) -> CubeFace {
    let (x, y, z) = (coords.x, coords.y, coords.z);
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());

    let axis = if ay < ax && az < ax {
        0
    } else if ax < ay && az < ay {
        1
    } else if ax < az && ay < az {
        2
    } else if ax == ay {
        if ax < az {
            2
        } else {
            0
        }
    } else if ax == az {
        if az < ay {
            1
        } else {
            2
        }
    } else if ay == az {
        if ay < ax {
            0
        } else {
            1
        }
    } else {
        0
    };

    CubeFace::from_axis(axis, coords[axis] >= 0.0)
}

/// Project a direction onto the given face.
pub fn project_to_face(face: CubeFace, coord: &Vec3) -> Vec2 {
    let (rx, ry, rz) = (coord.x, coord.y, coord.z);
    let (sc, tc, ma) = match face {
        CubeFace::NegativeX => (rz, -ry, -rx),
        CubeFace::PositiveX => (-rz, -ry, rx),
        CubeFace::NegativeY => (rx, -rz, -ry),
        CubeFace::PositiveY => (rx, rz, ry),
        CubeFace::NegativeZ => (-rx, -ry, -rz),
        CubeFace::PositiveZ => (rx, -ry, rz),
    };
    Vec2::new((sc / ma + 1.0) * 0.5, (tc / ma + 1.0) * 0.5)
}

/// Select the face and project onto it.
pub fn cube_face_coords(coord: &Vec3) -> CubeFaceCoords {
    let face = select_cube_face(coord);
    CubeFaceCoords {
        face,
        st: project_to_face(face, coord),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_directions_select_their_face() {
        assert_eq!(select_cube_face(&Vec3::new(1.0, 0.0, 0.0)), CubeFace::PositiveX);
        assert_eq!(select_cube_face(&Vec3::new(-2.0, 0.5, 0.5)), CubeFace::NegativeX);
        assert_eq!(select_cube_face(&Vec3::new(0.0, -1.0, 0.1)), CubeFace::NegativeY);
        assert_eq!(select_cube_face(&Vec3::new(0.1, 0.2, 0.9)), CubeFace::PositiveZ);
    }

    #[test]
    fn ties_resolve_deterministically() {
        assert_eq!(select_cube_face(&Vec3::new(1.0, 1.0, 0.5)), CubeFace::PositiveX);
        assert_eq!(select_cube_face(&Vec3::new(1.0, 1.0, 2.0)), CubeFace::PositiveZ);
        assert_eq!(select_cube_face(&Vec3::new(0.5, -1.0, 1.0)), CubeFace::NegativeY);
        assert_eq!(select_cube_face(&Vec3::new(1.0, 0.5, -1.0)), CubeFace::NegativeZ);
        assert_eq!(select_cube_face(&Vec3::new(1.0, 1.0, 1.0)), CubeFace::PositiveX);
        assert_eq!(select_cube_face(&Vec3::new(0.0, 0.0, 0.0)), CubeFace::PositiveX);
    }

    #[test]
    fn face_center_projects_to_half() {
        for face in CubeFace::ALL {
            let mut dir = Vec3::zeros();
            dir[face.axis()] = if face.is_positive() { 1.0 } else { -1.0 };
            let coords = cube_face_coords(&dir);
            assert_eq!(coords.face, face);
            assert!((coords.st - Vec2::new(0.5, 0.5)).norm() < 1e-6);
        }
    }

    #[test]
    fn positive_x_corner() {
        let st = project_to_face(CubeFace::PositiveX, &Vec3::new(1.0, -1.0, 1.0));
        assert_eq!(st, Vec2::new(0.0, 1.0));
    }
}
