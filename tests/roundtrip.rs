//! Write -> read -> write round trips through the public API.

use std::io::Cursor;

use serde_json::json;
use tile3d::format::names::BATCH_ID;
use tile3d::format::{
    GeometryFeatures, InstanceFeatures, PointColor, PointFeatures, PointNormals, PointPositions, VectorFeatures,
};
use tile3d::prelude::*;
use tile3d::table::{BatchTableHierarchy, ComponentType, HierarchyClass};
use tile3d::util::DVec3;

/// Serialize, parse through the registry, serialize again.
fn reread(tile: &mut dyn TileModel) -> (Vec<u8>, Box<dyn TileModel>) {
    let size = tile.calc_size().unwrap();
    assert_eq!(tile.calc_size().unwrap(), size);
    let bytes = tile.to_bytes().unwrap();
    assert_eq!(bytes.len() as u64, size);
    assert_eq!(bytes.len() % 8, 0);
    assert_eq!(tile.byte_length() as usize, bytes.len());

    let mut back = tile3d::io::from_bytes(&bytes).unwrap();
    assert_eq!(back.format(), tile.format());
    assert_eq!(back.to_bytes().unwrap(), bytes, "{} did not re-write byte for byte", tile.format());
    (bytes, back)
}

#[test]
fn test_b3dm_with_batch_table() {
    let mut tile = B3dm::with_glb(b"glTF\x02\0\0\0\x10\0\0\0abcd".to_vec());
    tile.set_features(&tile3d::format::BatchedFeatures { batch_length: 3, rtc_center: None });
    tile.batch_table.set_binary("height", BinaryProperty::scalars(&[10.0f64, 20.0, 30.0]));
    tile.batch_table.set_literal("name", json!(["a", "b", "c"]));

    let (_, back) = reread(&mut tile);
    let back = back.downcast_ref::<B3dm>().unwrap();
    assert_eq!(back.batch_length().unwrap(), 3);
    assert_eq!(back.batch_table.get("height", 2), Some(json!(30.0)));
    assert_eq!(back.batch_table.get("name", 1), Some(json!("b")));
    assert_eq!(back.embedded_glb(), b"glTF\x02\0\0\0\x10\0\0\0abcd");
}

#[test]
fn test_b3dm_hierarchy() {
    let hierarchy = BatchTableHierarchy {
        classes: vec![
            HierarchyClass { name: "Wall".into(), length: 2, ..Default::default() },
            HierarchyClass { name: "Building".into(), length: 1, ..Default::default() },
        ],
        instances_length: 3,
        class_ids: vec![0, 0, 1],
        parent_counts: Some(vec![1, 1, 0]),
        parent_ids: Some(vec![2, 2]),
    };
    let mut tile = B3dm::new();
    tile.set_features(&tile3d::format::BatchedFeatures { batch_length: 3, rtc_center: None });
    tile.batch_table.set_hierarchy(&hierarchy).unwrap();

    let (_, back) = reread(&mut tile);
    let back = back.downcast_ref::<B3dm>().unwrap();
    let read = back.batch_table.hierarchy().unwrap().unwrap();
    assert_eq!(read, hierarchy);
    assert_eq!(read.class_of(1).map(|c| c.name.as_str()), Some("Wall"));
    assert_eq!(read.parents_of(0), vec![2]);
}

#[test]
fn test_i3dm_embedded() {
    let mut tile = I3dm::new();
    tile.model = InstancedModel::Embedded(b"glTF\x02\0\0\0\x0c\0\0\0".to_vec());
    tile.set_features(&InstanceFeatures {
        instances_length: 2,
        position: Some(vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]),
        scale: Some(vec![1.0, 2.0]),
        batch_id: Some(vec![0, 1]),
        rtc_center: Some(DVec3::new(100.0, 200.0, 300.0)),
        east_north_up: Some(true),
        ..Default::default()
    });

    let (_, back) = reread(&mut tile);
    let back = back.downcast_ref::<I3dm>().unwrap();
    assert_eq!(back.features().unwrap(), tile.features().unwrap());
    assert_eq!(back.world_positions().unwrap()[1], DVec3::new(110.0, 200.0, 300.0));
    assert_eq!(back.embedded_glb().map(<[u8]>::len), Some(12));
}

#[test]
fn test_pnts_all_forms() {
    let mut tile = Pnts::new();
    tile.set_features(&PointFeatures {
        points_length: 3,
        positions: Some(PointPositions::quantize(&[
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(2.0, 4.0, 6.0),
        ])),
        color: Some(PointColor::Rgb565(vec![0xF800, 0x07E0, 0x001F])),
        normals: Some(PointNormals::Oct16P(vec![[128, 255], [255, 128], [0, 128]])),
        batch_id: Some(vec![0, 0, 1]),
        batch_length: Some(2),
        rtc_center: None,
    });
    tile.batch_table.set_binary("class", BinaryProperty::scalars(&[7u16, 8]));

    let (_, back) = reread(&mut tile);
    let back = back.downcast_ref::<Pnts>().unwrap();
    assert_eq!(back.features().unwrap(), tile.features().unwrap());
    assert_eq!(back.batch_length().unwrap(), 2);
    assert_eq!(back.colors_rgba().unwrap()[0], [255, 0, 0, 255]);
    assert_eq!(back.normals().len(), 3);

    let positions = back.world_positions().unwrap();
    assert!((positions[2] - DVec3::new(2.0, 4.0, 6.0)).abs().max_element() < 1e-3);
}

#[test]
fn test_geom() {
    let mut identity = [0.0f32; 16];
    for i in 0..4 {
        identity[i * 5] = 1.0;
    }
    let mut tile = Geom::new();
    tile.set_features(&GeometryFeatures {
        boxes: vec![identity],
        box_batch_ids: Some(vec![0]),
        spheres: vec![[0.0, 0.0, 0.0, 5.0], [10.0, 0.0, 0.0, 1.0]],
        sphere_batch_ids: Some(vec![1, 2]),
        ..Default::default()
    });

    let (_, back) = reread(&mut tile);
    let back = back.downcast_ref::<Geom>().unwrap();
    assert_eq!(back.features().unwrap(), tile.features().unwrap());
    assert_eq!(back.batch_length().unwrap(), 3);
}

#[test]
fn test_vctr() {
    let mut tile = Vctr::new();
    tile.set_features(&VectorFeatures {
        region: Some([0.1, 0.2, 0.3, 0.4, -10.0, 10.0]),
        polygons_length: 1,
        polygon_counts: Some(vec![4]),
        polygon_index_counts: Some(vec![6]),
        polygon_batch_ids: Some(vec![0]),
        points_length: 2,
        point_batch_ids: Some(vec![1, 2]),
        ..Default::default()
    });
    tile.polygon_indices = vec![0, 1, 2, 0, 2, 3];
    tile.polygon_positions = vec![[0, 0], [32767, 0], [32767, 32767], [0, 32767]];
    tile.point_positions = vec![[5, 6, 7], [65535, 0, 1]];

    let (_, back) = reread(&mut tile);
    let back = back.downcast_ref::<Vctr>().unwrap();
    assert_eq!(back.features().unwrap(), tile.features().unwrap());
    assert_eq!(back.polygon_positions, tile.polygon_positions);
    assert_eq!(back.point_positions, tile.point_positions);
    assert_eq!(back.region().unwrap(), Some([0.1, 0.2, 0.3, 0.4, -10.0, 10.0]));
}

#[test]
fn test_nested_cmpt_file() {
    let mut inner = Cmpt::new();
    inner.push(Geom::new());
    inner.push(Vctr::new());
    let mut outer = Cmpt::new();
    outer.push(I3dm::new());
    outer.push(inner);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested.cmpt");
    tile3d::io::save(&mut outer, &path).unwrap();
    let mut back = tile3d::io::open(&path).unwrap();

    let cmpt = back.downcast_ref::<Cmpt>().unwrap();
    let leaves: Vec<_> = cmpt.leaves().iter().map(|t| t.format()).collect();
    assert_eq!(leaves, vec![TileFormat::I3dm, TileFormat::Geom, TileFormat::Vctr]);
    let written = std::fs::read(&path).unwrap();
    assert_eq!(written.len() % 8, 0);
    assert_eq!(back.to_bytes().unwrap(), written);
}

#[test]
fn test_empty_tiles_stay_aligned() {
    let mut tiles: Vec<Box<dyn TileModel>> = vec![
        Box::new(B3dm::new()),
        Box::new(I3dm::new()),
        Box::new(Pnts::new()),
        Box::new(Geom::new()),
        Box::new(Vctr::new()),
    ];
    for tile in &mut tiles {
        let bytes = tile.to_bytes().unwrap();
        assert_eq!(bytes.len() % 8, 0, "{} is {} bytes", tile.format(), bytes.len());
    }

    let mut cmpt = Cmpt::new();
    cmpt.push(Geom::new());
    cmpt.push(Vctr::new());
    cmpt.push(Pnts::new());
    let bytes = cmpt.to_bytes().unwrap();
    let mut offset = 16;
    for child in cmpt.children() {
        assert_eq!(offset % 8, 0, "{} starts at {offset}", child.format());
        offset += child.byte_length() as usize;
    }
    assert_eq!(offset, bytes.len());
}

#[test]
fn test_offset_only_reference_rewrites_identically() {
    let json = br#"{"POINTS_LENGTH":1,"POSITION":{"byteOffset":0}}"#;
    let mut json = json.to_vec();
    while (28 + json.len()) % 8 != 0 {
        json.push(b' ');
    }
    let binary: Vec<u8> = [1.0f32, 2.0, 3.0, 0.0].iter().flat_map(|v| v.to_le_bytes()).collect();
    let total = 28 + json.len() + binary.len();
    let mut bytes = b"pnts".to_vec();
    for v in [1, total, json.len(), binary.len(), 0, 0] {
        bytes.extend_from_slice(&(v as u32).to_le_bytes());
    }
    bytes.extend_from_slice(&json);
    bytes.extend_from_slice(&binary);

    let mut tile = tile3d::io::from_bytes(&bytes).unwrap();
    assert_eq!(tile.to_bytes().unwrap(), bytes);
}

#[test]
fn test_batch_id_width_policy() {
    let cases: [(u32, ComponentType); 4] = [
        (254, ComponentType::UnsignedByte),
        (255, ComponentType::UnsignedShort),
        (65535, ComponentType::UnsignedShort),
        (65536, ComponentType::UnsignedInt),
    ];
    for (max, expected) in cases {
        let ids = vec![0, max / 2, max];
        let mut tile = I3dm::new();
        tile.set_features(&InstanceFeatures {
            instances_length: 3,
            position: Some(vec![[0.0; 3]; 3]),
            batch_id: Some(ids.clone()),
            ..Default::default()
        });
        let bytes = tile.to_bytes().unwrap();

        let mut back = I3dm::new();
        back.read(&mut Cursor::new(&bytes)).unwrap();
        let prop = back.feature_table.binary(BATCH_ID).unwrap();
        assert_eq!(prop.component_type(), expected, "max id {max}");
        assert_eq!(prop.to_u32_vec(), Some(ids));
    }
}

#[test]
fn test_calc_size_does_not_mutate() {
    let mut tile = Pnts::new();
    tile.set_features(&PointFeatures {
        points_length: 1,
        positions: Some(PointPositions::Double(vec![[1.0, 2.0, 3.0]])),
        ..Default::default()
    });
    let before = tile.clone();
    for _ in 0..3 {
        tile.calc_size().unwrap();
    }
    assert_eq!(tile, before);
}
