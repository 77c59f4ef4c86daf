//! Hand-built tiles exercising the read path and its failure modes.

use std::io::Cursor;

use tile3d::format::names::{BATCH_ID, POSITION};
use tile3d::prelude::*;
use tile3d::table::ComponentType;

/// Assemble a 28-byte-header tile around raw feature table sections.
fn raw_tile(magic: &[u8; 4], json: &str, binary: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while (28 + json.len()) % 8 != 0 {
        json.push(b' ');
    }
    let total = 28 + json.len() + binary.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(magic);
    for v in [1, total, json.len(), binary.len(), 0, 0] {
        out.extend_from_slice(&(v as u32).to_le_bytes());
    }
    out.extend_from_slice(&json);
    out.extend_from_slice(binary);
    out
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn test_pnts_position_length_scenario() {
    let json = r#"{"POSITION":{"byteOffset":0,"componentType":"FLOAT","type":"VEC3"},"POSITION_LENGTH":2}"#;
    let bytes = raw_tile(b"pnts", json, &f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));

    let tile = tile3d::io::from_bytes(&bytes).unwrap();
    let pnts = tile.downcast_ref::<Pnts>().unwrap();
    assert_eq!(pnts.points_length().unwrap(), 2);
    let positions = pnts.feature_table.binary(POSITION).unwrap();
    assert_eq!(positions.as_elements::<f32, 3>(), Some(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]][..]));
}

#[test]
fn test_cmpt_b3dm_then_pnts() {
    let mut cmpt = Cmpt::new();
    cmpt.push(B3dm::with_glb(b"glTF\x02\0\0\0\x0c\0\0\0".to_vec()));
    let mut pnts = Pnts::new();
    pnts.set_features(&tile3d::format::PointFeatures {
        points_length: 1,
        positions: Some(tile3d::format::PointPositions::Float(vec![[0.5, 0.5, 0.5]])),
        ..Default::default()
    });
    cmpt.push(pnts);
    let bytes = cmpt.to_bytes().unwrap();

    let tile = tile3d::io::from_bytes(&bytes).unwrap();
    assert_eq!(tile.format(), TileFormat::Cmpt);
    let children = tile.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].format(), TileFormat::B3dm);
    assert_eq!(children[1].format(), TileFormat::Pnts);
    let pnts = children[1].downcast_ref::<Pnts>().unwrap();
    assert_eq!(pnts.world_positions().unwrap().len(), 1);
}

#[test]
fn test_bad_magic() {
    let mut bytes = Pnts::new().to_bytes().unwrap();
    bytes[..4].copy_from_slice(b"xxxx");
    let err = tile3d::io::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::UnknownMagic(_)));

    let err = B3dm::new().read(&mut Cursor::new(&Pnts::new().to_bytes().unwrap())).unwrap_err();
    assert!(matches!(err, Error::InvalidMagic { .. }));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_truncated_header() {
    let bytes = Pnts::new().to_bytes().unwrap();
    let err = tile3d::io::from_bytes(&bytes[..20]).unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof(_)));
}

#[test]
fn test_reference_out_of_bounds() {
    let json = r#"{"POSITION":{"byteOffset":16,"componentType":"FLOAT","type":"VEC3"},"POINTS_LENGTH":2}"#;
    let bytes = raw_tile(b"pnts", json, &f32_bytes(&[0.0; 6]));
    let err = tile3d::io::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::ReferenceOutOfBounds { ref property, .. } if property == "POSITION"));
    assert_eq!(err.kind(), ErrorKind::Schema);
}

#[test]
fn test_malformed_json() {
    let bytes = raw_tile(b"pnts", r#"{"POINTS_LENGTH":"#, &[]);
    let err = tile3d::io::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn test_unsupported_component_is_omitted() {
    let json = r#"{"POSITION":{"byteOffset":0,"componentType":"HALF_FLOAT","type":"VEC3"},"POINTS_LENGTH":1}"#;
    let bytes = raw_tile(b"pnts", json, &[0u8; 8]);
    let tile = tile3d::io::from_bytes(&bytes).unwrap();
    let pnts = tile.downcast_ref::<Pnts>().unwrap();
    assert!(pnts.feature_table.binary(POSITION).is_none());
    assert!(pnts.world_positions().unwrap().is_empty());
}

#[test]
fn test_batch_id_declared_width_is_honored() {
    // UNSIGNED_INT ids although they would fit a byte
    let json = r#"{"BATCH_ID":{"byteOffset":0,"componentType":"UNSIGNED_INT"},"POINTS_LENGTH":2}"#;
    let ids: Vec<u8> = [3u32, 9].iter().flat_map(|v| v.to_le_bytes()).collect();
    let bytes = raw_tile(b"pnts", json, &ids);
    let tile = tile3d::io::from_bytes(&bytes).unwrap();
    let pnts = tile.downcast_ref::<Pnts>().unwrap();
    let prop = pnts.feature_table.binary(BATCH_ID).unwrap();
    assert_eq!(prop.component_type(), ComponentType::UnsignedInt);
    assert_eq!(prop.to_u32_vec(), Some(vec![3, 9]));
}

#[test]
fn test_declared_length_disagrees() {
    let mut bytes = Pnts::new().to_bytes().unwrap();
    bytes.extend_from_slice(&[0u8; 8]);
    let len = bytes.len() as u32;
    bytes[8..12].copy_from_slice(&len.to_le_bytes());
    let err = tile3d::io::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Invariant);
}
