use hotwirekit_core::{solid_from_stl_file, GeometryError};
use std::fs::File;
use stl_io::{Normal, Triangle, Vertex};

fn tri(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Triangle {
    Triangle {
        normal: Normal::new([0.0, 0.0, 0.0]),
        vertices: [Vertex::new(a), Vertex::new(b), Vertex::new(c)],
    }
}

/// Triangular prism with its side quads split on the diagonal.
fn wedge() -> Vec<Triangle> {
    let low = [[0.0, 0.0, 0.0], [30.0, 0.0, 0.0], [0.0, 40.0, 0.0]];
    let high = [[0.0, 0.0, 100.0], [30.0, 0.0, 100.0], [0.0, 40.0, 100.0]];
    let mut out = Vec::new();
    for i in 0..3 {
        let j = (i + 1) % 3;
        out.push(tri(low[i], low[j], high[i]));
        out.push(tri(low[j], high[j], high[i]));
    }
    out.push(tri(low[0], low[2], low[1]));
    out.push(tri(high[0], high[1], high[2]));
    out
}

#[test]
fn test_stl_file_import() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wedge.stl");
    {
        let mut file = File::create(&path).unwrap();
        stl_io::write_stl(&mut file, wedge().iter()).unwrap();
    }

    let solid = solid_from_stl_file(&path).unwrap();
    assert_eq!(solid.name(), "wedge");
    assert_eq!(solid.faces().iter().filter(|f| f.is_transversal()).count(), 3);

    let bbox = solid.bounding_box().unwrap();
    assert!((bbox.x_length() - 30.0).abs() < 1e-4);
    assert!((bbox.y_length() - 40.0).abs() < 1e-4);
    assert!((bbox.z_length() - 100.0).abs() < 1e-4);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = solid_from_stl_file("/nonexistent/part.stl").unwrap_err();
    assert!(matches!(err, GeometryError::IoError(_)));
}
