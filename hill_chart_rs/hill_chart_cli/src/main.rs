use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use hill_chart::http::{ChartRequest, Request, Router};
use hill_chart::{clamp_progress, ImageFormat, RenderOptions, Renderer, Theme};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about = "Hill chart renderer CLI", long_about = None)]
struct Cli {
    /// Theme JSON overriding the default colors and sizes
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    theme: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single chart at progress `t`
    Render(RenderArgs),
    /// Render evenly spaced frames from 0 to 100 percent
    Sweep(SweepArgs),
    /// Route a `/v2/...` request path and print the response
    Get(GetArgs),
}

#[derive(Parser, Debug)]
struct ChartArgs {
    /// Output image format
    #[arg(long, value_enum, default_value_t = FormatOpt::Jpg)]
    format: FormatOpt,

    /// Title drawn in the top-left corner
    #[arg(long)]
    title: Option<String>,

    /// Omit the two phase labels
    #[arg(long, action = ArgAction::SetTrue)]
    hide_labels: bool,
}

impl ChartArgs {
    fn options(&self) -> RenderOptions {
        RenderOptions {
            title: self.title.clone(),
            show_labels: !self.hide_labels,
        }
    }
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Progress along the hill, 0..1 (clamped)
    #[arg(allow_negative_numbers = true)]
    t: f64,

    /// Read `t` as a percentage, 0..100
    #[arg(long, action = ArgAction::SetTrue)]
    percent: bool,

    /// Output path (`-` for stdout); defaults to the download file name
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    #[command(flatten)]
    chart: ChartArgs,
}

#[derive(Parser, Debug)]
struct SweepArgs {
    /// Number of intervals; `steps + 1` frames are written
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=100))]
    steps: u32,

    /// Directory receiving the frames
    #[arg(long, default_value = ".", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    #[command(flatten)]
    chart: ChartArgs,
}

#[derive(Parser, Debug)]
struct GetArgs {
    /// Request target, e.g. `/v2/35/png?title=Roadmap`
    target: String,

    /// Write the response body here (`-` for stdout)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatOpt {
    Png,
    Jpg,
    Svg,
}

impl From<FormatOpt> for ImageFormat {
    fn from(value: FormatOpt) -> Self {
        match value {
            FormatOpt::Png => ImageFormat::Png,
            FormatOpt::Jpg => ImageFormat::Jpeg,
            FormatOpt::Svg => ImageFormat::Svg,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let renderer = Renderer::new(load_theme(cli.theme.as_deref())?).context("invalid theme")?;
    match cli.command {
        Command::Render(args) => handle_render(&renderer, args),
        Command::Sweep(args) => handle_sweep(&renderer, args),
        Command::Get(args) => handle_get(renderer, args),
    }
}

fn load_theme(path: Option<&Path>) -> Result<Theme> {
    match path {
        Some(path) => {
            let theme = Theme::load(path)
                .with_context(|| format!("failed to load theme {}", path.display()))?;
            debug!("Loaded theme: {}", path.display());
            Ok(theme)
        }
        None => Ok(Theme::default()),
    }
}

/// Whole percent used in file names for progress `t`.
fn percent_of(t: f64) -> u8 {
    (clamp_progress(t) * 100.0).round() as u8
}

fn default_filename(t: f64, format: ImageFormat, options: &RenderOptions) -> String {
    ChartRequest {
        percent: percent_of(t),
        format,
        options: options.clone(),
        download: false,
    }
    .filename()
}

fn handle_render(renderer: &Renderer, args: RenderArgs) -> Result<()> {
    let t = if args.percent { args.t / 100.0 } else { args.t };
    if !(0.0..=1.0).contains(&t) {
        warn!("t = {} is outside 0..1 and will be clamped", t);
    }
    let format = ImageFormat::from(args.chart.format);
    let options = args.chart.options();

    let started = Instant::now();
    let bytes = renderer
        .render(t, format, &options)
        .context("failed to render chart")?;
    debug!("Rendered in {:.1?}", started.elapsed());

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(default_filename(t, format, &options)));
    write_output(&output, &bytes)
}

fn handle_sweep(renderer: &Renderer, args: SweepArgs) -> Result<()> {
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    let format = ImageFormat::from(args.chart.format);
    let options = args.chart.options();

    let started = Instant::now();
    let written = (0..=args.steps)
        .into_par_iter()
        .map(|step| -> Result<PathBuf> {
            let t = f64::from(step) / f64::from(args.steps);
            let bytes = renderer
                .render(t, format, &options)
                .with_context(|| format!("failed to render frame at t = {:.3}", t))?;
            let path = args.out_dir.join(default_filename(t, format, &options));
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Wrote {} frames to {} in {:.1?}",
        written.len(),
        args.out_dir.display(),
        started.elapsed()
    );
    Ok(())
}

fn handle_get(renderer: Renderer, args: GetArgs) -> Result<()> {
    if !args.target.starts_with('/') {
        return Err(anyhow!(
            "request target must start with '/': {}",
            args.target
        ));
    }
    let mut router = Router::new(renderer);
    let response = router.handle(&Request::get(&args.target));

    {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "HTTP {}", response.status)?;
        for (name, value) in &response.headers {
            writeln!(handle, "{}: {}", name, value)?;
        }
        if args.output.is_none() {
            if response.is_success() {
                writeln!(handle, "\n({} byte body, use --output to save)", response.body.len())?;
            } else {
                writeln!(handle, "\n{}", String::from_utf8_lossy(&response.body))?;
            }
        }
    }

    if let Some(output) = args.output {
        write_output(&output, &response.body)?;
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if path.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(bytes)
            .context("failed to write to stdout")?;
        handle.flush()?;
        return Ok(());
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote chart: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "hill-chart",
            "render",
            "35",
            "--percent",
            "--format",
            "png",
            "--title",
            "Roadmap",
            "--hide-labels",
        ])
        .unwrap();
        match cli.command {
            Command::Render(args) => {
                assert_eq!(args.t, 35.0);
                assert!(args.percent);
                assert!(matches!(args.chart.format, FormatOpt::Png));
                let options = args.chart.options();
                assert_eq!(options.title.as_deref(), Some("Roadmap"));
                assert!(!options.show_labels);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_accepts_negative_progress() {
        let cli = Cli::try_parse_from(["hill-chart", "render", "-0.5"]).unwrap();
        assert!(matches!(cli.command, Command::Render(ref args) if args.t == -0.5));
    }

    #[test]
    fn test_sweep_steps_are_bounded() {
        assert!(Cli::try_parse_from(["hill-chart", "sweep", "--steps", "0"]).is_err());
        assert!(Cli::try_parse_from(["hill-chart", "sweep", "--steps", "101"]).is_err());
        assert!(Cli::try_parse_from(["hill-chart", "sweep", "--steps", "4"]).is_ok());
    }

    #[test]
    fn test_default_filename() {
        let options = RenderOptions::default().with_title("Big Launch");
        assert_eq!(
            default_filename(0.354, ImageFormat::Png, &options),
            "hill-chart-at-35-Big_Launch.png"
        );
        assert_eq!(
            default_filename(7.0, ImageFormat::Jpeg, &RenderOptions::default()),
            "hill-chart-at-100.jpg"
        );
    }

    #[test]
    fn test_sweep_writes_frames() {
        let dir = std::env::temp_dir().join(format!("hill-chart-sweep-{}", std::process::id()));
        let renderer = Renderer::new(Theme {
            base_height: 20,
            pixel_density: 1,
            ..Theme::default()
        })
        .unwrap();
        let args = SweepArgs {
            steps: 4,
            out_dir: dir.clone(),
            chart: ChartArgs {
                format: FormatOpt::Svg,
                title: None,
                hide_labels: false,
            },
        };
        handle_sweep(&renderer, args).unwrap();
        for pct in [0, 25, 50, 75, 100] {
            assert!(dir.join(format!("hill-chart-at-{}.svg", pct)).exists());
        }
        let _ = fs::remove_dir_all(&dir);
    }
}
