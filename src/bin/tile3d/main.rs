//! tile3d CLI - inspect, verify and re-write 3D Tiles binary tiles.

use std::env;
use std::path::Path;

use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use tile3d::prelude::*;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    match filtered_args[0] {
        // Info command - header summary per tile
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: tile3d info <file>");
                std::process::exit(1);
            }
            cmd_info(filtered_args[1]);
        }

        // Dump command - table headers as JSON
        "dump" | "d" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: tile3d dump <file>");
                std::process::exit(1);
            }
            cmd_dump(filtered_args[1]);
        }

        // Check command - read, re-write and compare
        "check" | "k" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: tile3d check <file>...");
                std::process::exit(1);
            }
            cmd_check(&filtered_args[1..]);
        }

        // Copy command - round-trip to a new file
        "copy" | "c" => {
            if filtered_args.len() < 3 {
                eprintln!("Error: missing arguments");
                eprintln!("Usage: tile3d copy <input> <output>");
                std::process::exit(1);
            }
            cmd_copy(filtered_args[1], filtered_args[2]);
        }

        "--version" | "-V" | "version" => print_version(),

        // Help
        "help" | "h" | "-h" | "--help" => print_help(),

        // Default: if file exists, show info; otherwise error
        _ => {
            if Path::new(filtered_args[0]).exists() {
                cmd_info(filtered_args[0]);
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    }
}

fn print_version() {
    println!(
        "tile3d {} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("TILE3D_BUILD_DATE"),
        env!("TILE3D_BUILD_TIME")
    );
}

fn print_help() {
    println!("tile3d - 3D Tiles binary tile toolkit");
    println!();
    println!("USAGE:");
    println!("    tile3d [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>              Show header and feature summary");
    println!("    d, dump   <file>              Print feature and batch table headers as JSON");
    println!("    k, check  <file>...           Verify that tiles re-write byte for byte");
    println!("    c, copy   <in> <out>          Read a tile and write it back out");
    println!("    -V, --version                 Show version and build date");
    println!("    h, help                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only report errors");
    println!();
    println!("EXAMPLES:");
    println!("    tile3d info building.b3dm");
    println!("    tile3d dump trees.i3dm");
    println!("    tile3d check tiles/*.pnts");
    println!("    tile3d -v copy in.cmpt out.cmpt");
    println!();
    println!("NOTES:");
    println!("    - Passing a tile file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the level chosen by -v/-vv/-q");
    println!("    - 'check' expects tables laid out the way tile3d writes them: properties packed");
    println!("      in order, JSON keys sorted. Short references such as {{\"byteOffset\":0}} keep");
    println!("      their short form as long as the stored types are the implied ones");
}

fn open_or_exit(path: &str) -> Box<dyn TileModel> {
    match tile3d::io::open(path) {
        Ok(tile) => tile,
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn cmd_info(path: &str) {
    tracing::info!("Opening tile: {}", path);
    let tile = open_or_exit(path);
    println!("File: {}", path);
    print_info(tile.as_ref(), 0);
}

fn print_info(tile: &dyn TileModel, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} v{} ({} bytes)",
        tile.format(),
        tile.version(),
        tile.byte_length()
    );
    if let Err(e) = print_details(tile, &indent) {
        println!("{indent}  <error: {e}>");
    }
    if let Some(ft) = tile.feature_table() {
        let keys: Vec<_> = ft.header.keys().map(String::as_str).collect();
        if !keys.is_empty() {
            println!("{indent}  Feature table: {}", keys.join(", "));
        }
    }
    if let Some(bt) = tile.batch_table() {
        let names: Vec<_> = bt.property_names().collect();
        if !names.is_empty() {
            println!("{indent}  Batch table:   {}", names.join(", "));
        }
    }
    for child in tile.children() {
        print_info(child.as_ref(), depth + 1);
    }
}

fn print_details(tile: &dyn TileModel, indent: &str) -> tile3d::Result<()> {
    if let Some(t) = tile.downcast_ref::<B3dm>() {
        println!("{indent}  Batch length:  {}", t.batch_length()?);
        println!("{indent}  glTF:          {} bytes", t.embedded_glb().len());
    } else if let Some(t) = tile.downcast_ref::<I3dm>() {
        println!("{indent}  Instances:     {}", t.instances_length()?);
        println!("{indent}  Batch length:  {}", t.batch_length()?);
        match &t.model {
            InstancedModel::Uri(uri) => println!("{indent}  glTF URI:      {uri}"),
            InstancedModel::Embedded(glb) => println!("{indent}  glTF:          {} bytes", glb.len()),
        }
    } else if let Some(t) = tile.downcast_ref::<Pnts>() {
        println!("{indent}  Points:        {}", t.points_length()?);
        println!("{indent}  Batch length:  {}", t.batch_length()?);
    } else if let Some(t) = tile.downcast_ref::<Geom>() {
        let f = t.features()?;
        println!(
            "{indent}  Boxes {}, cylinders {}, ellipsoids {}, spheres {}",
            f.boxes.len(),
            f.cylinders.len(),
            f.ellipsoids.len(),
            f.spheres.len()
        );
        println!("{indent}  Batch length:  {}", t.batch_length()?);
    } else if let Some(t) = tile.downcast_ref::<Vctr>() {
        let f = t.features()?;
        println!(
            "{indent}  Polygons {}, polylines {}, points {}",
            f.polygons_length, f.polylines_length, f.points_length
        );
        if let Some(r) = f.region {
            println!("{indent}  Region:        {:?}", r);
        }
        println!("{indent}  Batch length:  {}", t.batch_length()?);
    } else if let Some(t) = tile.downcast_ref::<Cmpt>() {
        println!("{indent}  Tiles:         {}", t.len());
    }
    Ok(())
}

fn cmd_dump(path: &str) {
    let tile = open_or_exit(path);
    let json = dump_json(tile.as_ref());
    match serde_json::to_string_pretty(&json) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Failed to serialize {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn dump_json(tile: &dyn TileModel) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert("format".into(), tile.format().name().into());
    obj.insert("version".into(), tile.version().into());
    obj.insert("byteLength".into(), tile.byte_length().into());
    if let Some(ft) = tile.feature_table() {
        obj.insert("featureTable".into(), ft.header_json());
    }
    if let Some(bt) = tile.batch_table() {
        obj.insert("batchTable".into(), bt.header_json());
    }
    if !tile.children().is_empty() {
        let tiles = tile.children().iter().map(|c| dump_json(c.as_ref())).collect();
        obj.insert("tiles".into(), serde_json::Value::Array(tiles));
    }
    serde_json::Value::Object(obj)
}

/// Read, re-write and compare one file.
fn check_file(path: &str) -> tile3d::Result<usize> {
    let bytes = std::fs::read(path)?;
    let mut tile = tile3d::io::from_bytes(&bytes)?;
    let written = tile.to_bytes()?;
    if written != bytes {
        let at = written.iter().zip(&bytes).position(|(a, b)| a != b).unwrap_or(written.len().min(bytes.len()));
        return Err(Error::invalid(format!(
            "re-written tile differs at byte {at} ({} vs {} bytes)",
            written.len(),
            bytes.len()
        )));
    }
    Ok(bytes.len())
}

fn cmd_check(paths: &[&str]) {
    let results: Vec<_> = paths.par_iter().map(|p| (*p, check_file(p))).collect();
    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(len) => println!("OK    {path} ({len} bytes)"),
            Err(e) => {
                failed += 1;
                println!("FAIL  {path}: {e}");
            }
        }
    }
    tracing::info!("{} checked, {} failed", results.len(), failed);
    if failed > 0 {
        std::process::exit(1);
    }
}

fn cmd_copy(input: &str, output: &str) {
    tracing::info!("Copying {} -> {}", input, output);
    let mut tile = open_or_exit(input);
    if let Err(e) = tile3d::io::save(tile.as_mut(), output) {
        eprintln!("Failed to write {}: {}", output, e);
        std::process::exit(1);
    }
    println!("Copied {} -> {} ({} bytes)", input, output, tile.byte_length());
}
