//! Well-known feature table property names.

// Shared
pub const BATCH_LENGTH: &str = "BATCH_LENGTH";
pub const BATCH_ID: &str = "BATCH_ID";
pub const RTC_CENTER: &str = "RTC_CENTER";
pub const POSITION: &str = "POSITION";
pub const POSITION_QUANTIZED: &str = "POSITION_QUANTIZED";
pub const QUANTIZED_VOLUME_OFFSET: &str = "QUANTIZED_VOLUME_OFFSET";
pub const QUANTIZED_VOLUME_SCALE: &str = "QUANTIZED_VOLUME_SCALE";

// i3dm
pub const INSTANCES_LENGTH: &str = "INSTANCES_LENGTH";
pub const EAST_NORTH_UP: &str = "EAST_NORTH_UP";
pub const NORMAL_UP: &str = "NORMAL_UP";
pub const NORMAL_RIGHT: &str = "NORMAL_RIGHT";
pub const NORMAL_UP_OCT32P: &str = "NORMAL_UP_OCT32P";
pub const NORMAL_RIGHT_OCT32P: &str = "NORMAL_RIGHT_OCT32P";
pub const SCALE: &str = "SCALE";
pub const SCALE_NON_UNIFORM: &str = "SCALE_NON_UNIFORM";

// pnts
pub const POINTS_LENGTH: &str = "POINTS_LENGTH";
/// Older spelling of [`POINTS_LENGTH`], accepted on read.
pub const POSITION_LENGTH: &str = "POSITION_LENGTH";
pub const RGBA: &str = "RGBA";
pub const RGB: &str = "RGB";
pub const RGB565: &str = "RGB565";
pub const CONSTANT_RGBA: &str = "CONSTANT_RGBA";
pub const NORMAL: &str = "NORMAL";
pub const NORMAL_OCT16P: &str = "NORMAL_OCT16P";

// geom
pub const BOXES_LENGTH: &str = "BOXES_LENGTH";
pub const BOXES: &str = "BOXES";
pub const BOX_BATCH_IDS: &str = "BOX_BATCH_IDS";
pub const CYLINDERS_LENGTH: &str = "CYLINDERS_LENGTH";
pub const CYLINDERS: &str = "CYLINDERS";
pub const CYLINDER_BATCH_IDS: &str = "CYLINDER_BATCH_IDS";
pub const ELLIPSOIDS_LENGTH: &str = "ELLIPSOIDS_LENGTH";
pub const ELLIPSOIDS: &str = "ELLIPSOIDS";
pub const ELLIPSOID_BATCH_IDS: &str = "ELLIPSOID_BATCH_IDS";
pub const SPHERES_LENGTH: &str = "SPHERES_LENGTH";
pub const SPHERES: &str = "SPHERES";
pub const SPHERE_BATCH_IDS: &str = "SPHERE_BATCH_IDS";

// vctr
pub const REGION: &str = "REGION";
pub const POLYGONS_LENGTH: &str = "POLYGONS_LENGTH";
pub const POLYGON_COUNTS: &str = "POLYGON_COUNTS";
pub const POLYGON_INDEX_COUNTS: &str = "POLYGON_INDEX_COUNTS";
pub const POLYGON_MINIMUM_HEIGHTS: &str = "POLYGON_MINIMUM_HEIGHTS";
pub const POLYGON_MAXIMUM_HEIGHTS: &str = "POLYGON_MAXIMUM_HEIGHTS";
pub const POLYGON_BATCH_IDS: &str = "POLYGON_BATCH_IDS";
pub const POLYLINES_LENGTH: &str = "POLYLINES_LENGTH";
pub const POLYLINE_COUNTS: &str = "POLYLINE_COUNTS";
pub const POLYLINE_WIDTHS: &str = "POLYLINE_WIDTHS";
pub const POLYLINE_BATCH_IDS: &str = "POLYLINE_BATCH_IDS";
pub const POINT_BATCH_IDS: &str = "POINT_BATCH_IDS";
