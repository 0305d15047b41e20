use ffd_engine::geom::{CornerMode, FfdOptions, GeomMesh, deform_mesh};
use ffd_engine::parse::lattice_json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const USAGE: &str = r#"ffd_cli (ffd-engine)

USAGE:
  ffd_cli deform --json <lattice.json> --mesh <input.obj> --output <output.obj> [options]
  ffd_cli help

OPTIONS (deform):
  --json <path>      Lattice description with `lattice_deformations`
  --mesh <path>      Input OBJ mesh; only `v` lines are moved
  --output <path>    Output OBJ path
  --approximate      Use corner offsets directly as B-spline control values
  --overwrite        Overwrite an existing output file
  -h, --help         Show this help

The mesh box and each resolved corner are logged at info level.
Set RUST_LOG=debug for per-scene logging.
"#;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("ffd_cli error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = Args::new(std::env::args().skip(1).collect());

    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "deform" => cmd_deform(&mut args),
        "-h" | "--help" | "help" => {
            print_usage();
            Ok(())
        }
        other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
    }
}

fn print_usage() {
    println!("{USAGE}");
}

fn cmd_deform(args: &mut Args) -> Result<(), String> {
    let mut json_path: Option<PathBuf> = None;
    let mut mesh_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut options = FfdOptions::default();
    let mut overwrite = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json_path = Some(PathBuf::from(args.value("--json")?)),
            "--mesh" => mesh_path = Some(PathBuf::from(args.value("--mesh")?)),
            "--output" => output_path = Some(PathBuf::from(args.value("--output")?)),
            "--approximate" => options = options.corner_mode(CornerMode::Approximating),
            "--overwrite" => overwrite = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
        }
    }

    let json_path = json_path.ok_or("missing --json")?;
    let mesh_path = mesh_path.ok_or("missing --mesh")?;
    let output_path = output_path.ok_or("missing --output")?;

    let document = lattice_json::read_file(&json_path)
        .map_err(|e| format!("{}: {e}", json_path.display()))?;

    let text = fs::read_to_string(&mesh_path)
        .map_err(|e| format!("read {}: {e}", mesh_path.display()))?;
    let mut obj = ObjText::parse(&text).map_err(|e| format!("{}: {e}", mesh_path.display()))?;

    let (deformed, diag) = deform_obj(&mut obj, &document, options)?;
    for warning in &diag.warnings {
        log::warn!("{warning}");
    }

    write_obj_file(&output_path, &obj, &deformed.positions, overwrite)?;
    println!(
        "B-spline (2x2x2) deformation complete: {} vertices, max displacement {:.6}, saved to {}",
        deformed.vertex_count(),
        diag.max_displacement,
        output_path.display()
    );
    Ok(())
}

/// Runs the mesh path on the OBJ's vertices. Faces are written back verbatim,
/// so the mesh carries no triangle indices.
fn deform_obj(
    obj: &mut ObjText<'_>,
    document: &lattice_json::LatticeDocument,
    options: FfdOptions,
) -> Result<(GeomMesh, ffd_engine::FfdDiagnostics), String> {
    let mesh = GeomMesh::new(std::mem::take(&mut obj.positions), Vec::new());
    deform_mesh(&mesh, document.descriptions(), options).map_err(|e| e.to_string())
}

/// An OBJ file split into vertex positions and every other line verbatim.
struct ObjText<'a> {
    lines: Vec<ObjLine<'a>>,
    positions: Vec<[f64; 3]>,
}

enum ObjLine<'a> {
    /// A `v` line; `tail` holds anything after `z` (e.g. `w` or vertex colors).
    Vertex { index: usize, tail: Vec<&'a str> },
    Other(&'a str),
}

impl<'a> ObjText<'a> {
    fn parse(text: &'a str) -> Result<Self, String> {
        let mut lines = Vec::new();
        let mut positions = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            if tokens.next() != Some("v") {
                lines.push(ObjLine::Other(line));
                continue;
            }

            let mut p = [0.0; 3];
            for value in &mut p {
                let token = tokens
                    .next()
                    .ok_or_else(|| format!("line {}: vertex needs three coordinates", line_no + 1))?;
                *value = token
                    .parse()
                    .map_err(|e| format!("line {}: bad coordinate `{token}`: {e}", line_no + 1))?;
            }
            lines.push(ObjLine::Vertex {
                index: positions.len(),
                tail: tokens.collect(),
            });
            positions.push(p);
        }

        if positions.is_empty() {
            return Err("mesh has no vertices".to_string());
        }
        log::debug!("read {} vertices from {} lines", positions.len(), lines.len());
        Ok(Self { lines, positions })
    }
}

fn write_obj_file(
    path: &Path,
    obj: &ObjText<'_>,
    positions: &[[f64; 3]],
    overwrite: bool,
) -> Result<(), String> {
    if path.exists() && !overwrite {
        return Err(format!(
            "refusing to overwrite existing file {} (use --overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
    }

    let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
    let mut w = BufWriter::new(file);

    for line in &obj.lines {
        match line {
            ObjLine::Vertex { index, tail } => {
                let p = positions[*index];
                write!(w, "v {} {} {}", p[0], p[1], p[2]).map_err(|e| format!("write obj: {e}"))?;
                for token in tail {
                    write!(w, " {token}").map_err(|e| format!("write obj: {e}"))?;
                }
                writeln!(w).map_err(|e| format!("write obj: {e}"))?;
            }
            ObjLine::Other(text) => writeln!(w, "{text}").map_err(|e| format!("write obj: {e}"))?,
        }
    }

    w.flush().map_err(|e| format!("flush {}: {e}", path.display()))
}

struct Args {
    args: Vec<String>,
    pos: usize,
}

impl Args {
    fn new(args: Vec<String>) -> Self {
        Self { args, pos: 0 }
    }

    fn next(&mut self) -> Option<String> {
        let arg = self.args.get(self.pos)?.clone();
        self.pos += 1;
        Some(arg)
    }

    fn value(&mut self, flag: &str) -> Result<String, String> {
        self.next()
            .ok_or_else(|| format!("missing value for {flag}"))
    }
}
