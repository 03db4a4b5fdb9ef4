//! tabterm - a minimal tabbed terminal emulator.
//!
//! Main entry point: command-line parsing, logging, window creation.

use anyhow::{Context as _, Result};
use clap::Parser;
use gpui::*;
use gpui_component_assets::Assets;
use std::path::PathBuf;
use tabterm_workspace::{StartupTab, Workspace, WorkspaceParams};
use tracing::{debug, error, info};

/// Estimated cell metrics used to size the window before a frame has been
/// rendered; panes measure the real font afterwards.
const APPROX_CELL: (f32, f32) = (8.4, 17.0);

#[derive(Parser, Debug)]
#[command(name = "tabterm", version, about = "mini terminal emulator")]
struct Cli {
    /// Execute the given command in the first tab
    #[arg(short = 'e', long)]
    execute: Option<String>,

    /// Window title
    #[arg(short = 't', long)]
    title: Option<String>,

    /// Initial terminal size as COLSxROWS (e.g. 80x24)
    #[arg(long)]
    geometry: Option<String>,

    /// Create a tab; format is "[tab-title  [cwd  ]][command]"
    /// (fields separated by two spaces)
    #[arg(long = "tab")]
    tabs: Vec<String>,
}

/// Parse a `--tab` value: `[title<two-spaces>[cwd<two-spaces>]]command`.
/// Empty segments (adjacent separators, nothing after the last one) are
/// treated as absent.
fn parse_tab_spec(value: &str) -> StartupTab {
    let mut spec = StartupTab::default();
    match value.split_once("  ") {
        None => {
            if !value.is_empty() {
                spec.command = Some(value.to_string());
            }
        }
        Some((title, rest)) => {
            if !title.is_empty() {
                spec.title = Some(title.to_string());
            }
            match rest.split_once("  ") {
                None => {
                    if !rest.is_empty() {
                        spec.command = Some(rest.to_string());
                    }
                }
                Some((cwd, command)) => {
                    if !cwd.is_empty() {
                        spec.cwd = Some(PathBuf::from(cwd));
                    }
                    if !command.is_empty() {
                        spec.command = Some(command.to_string());
                    }
                }
            }
        }
    }
    spec
}

/// Parse `--geometry` as COLSxROWS.
fn parse_geometry(value: &str) -> Option<(u32, u32)> {
    let (cols, rows) = value.split_once('x')?;
    let cols: u32 = cols.parse().ok()?;
    let rows: u32 = rows.parse().ok()?;
    (cols > 0 && rows > 0).then_some((cols, rows))
}

/// The startup tab list: a default tab when `-e` was given or no `--tab`
/// entries were, then one tab per `--tab`.
fn startup_tabs(cli: &Cli) -> Vec<StartupTab> {
    let mut tabs = Vec::new();
    if cli.execute.is_some() || cli.tabs.is_empty() {
        tabs.push(StartupTab {
            command: cli.execute.clone(),
            ..StartupTab::default()
        });
    }
    tabs.extend(cli.tabs.iter().map(|value| parse_tab_spec(value)));
    tabs
}

fn is_debug_mode() -> bool {
    std::env::var("TABTERM_DEBUG").is_ok()
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = if is_debug_mode() {
        "tabterm=trace,info"
    } else {
        "tabterm=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("tabterm v{} starting up", env!("CARGO_PKG_VERSION"));
}

/// Compute a centered origin for the given window size on the primary display.
fn centered_origin(w: f32, h: f32, cx: &mut App) -> Point<Pixels> {
    if let Some(display) = cx.primary_display() {
        let screen = display.bounds();
        let x = (f32::from(screen.size.width) - w) / 2.0;
        let y = (f32::from(screen.size.height) - h) / 2.0;
        Point::new(px(x.max(0.0)), px(y.max(0.0)))
    } else {
        Point::default()
    }
}

/// Window size for a terminal grid, from estimated cell metrics.
fn window_size_for_grid(cols: u32, rows: u32) -> (f32, f32) {
    let (cell_w, cell_h) = APPROX_CELL;
    let width = cols as f32 * cell_w + 2.0 * settings::constants::terminal::PADDING;
    let height = rows as f32 * cell_h
        + 2.0 * settings::constants::terminal::PADDING
        + settings::constants::tab_bar::HEIGHT;
    (width, height)
}

fn build_window_options(title: &str, geometry: Option<(u32, u32)>, cx: &mut App) -> WindowOptions {
    let (cols, rows) = geometry.unwrap_or((80, 24));
    let (w, h) = window_size_for_grid(cols, rows);
    WindowOptions {
        window_bounds: Some(WindowBounds::Windowed(Bounds {
            origin: centered_origin(w, h, cx),
            size: Size {
                width: px(w),
                height: px(h),
            },
        })),
        titlebar: Some(TitlebarOptions {
            title: Some(SharedString::from(title.to_string())),
            appears_transparent: false,
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn open_main_window(
    title: &str,
    geometry: Option<(u32, u32)>,
    params: WorkspaceParams,
    cx: &mut App,
) -> Result<()> {
    let options = build_window_options(title, geometry, cx);
    cx.open_window(options, |window, cx| {
        let workspace = cx.new(|cx| Workspace::new(params, cx));

        // Closing the window asks the workspace first (running-children
        // confirmation, save-at-exit).
        let close_target = workspace.clone();
        window.on_window_should_close(cx, move |_window, cx| {
            close_target.update(cx, |workspace, cx| workspace.request_quit(cx))
        });

        cx.new(|cx| gpui_component::Root::new(workspace, window, cx))
    })
    .context("failed to open main window")?;

    debug!("main window opened");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    init_logging();

    let geometry = match cli.geometry.as_deref() {
        Some(value) => {
            let parsed = parse_geometry(value);
            if parsed.is_none() {
                error!("invalid geometry string: {}", value);
            }
            parsed
        }
        None => None,
    };

    let config = settings::load_config();
    let tabs = startup_tabs(&cli);
    let title = cli.title.clone().unwrap_or_else(|| "tabterm".to_string());

    let app = Application::new().with_assets(Assets);
    app.run(move |cx: &mut App| {
        cx.activate(true);
        gpui_component::init(cx);

        cx.on_action(|_: &actions::Quit, cx| {
            info!("application quit requested");
            cx.quit();
        });

        let params = WorkspaceParams {
            config,
            startup_tabs: tabs,
        };
        // Window creation failure is the one fatal error.
        if let Err(e) = open_main_window(&title, geometry, params, cx) {
            error!("{:#}", e);
            cx.quit();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    // `use super::*` pulls in gpui's `test` attribute macro (re-exported at the
    // gpui crate root via the glob import above), which would shadow the
    // built-in `#[test]` and recurse. Import the built-in explicitly so the
    // plain `#[test]` attributes below resolve to it.
    use ::core::prelude::v1::test;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn tab_spec_with_title_cwd_and_command() {
        let spec = parse_tab_spec("MyTab  /tmp  ls -la");
        assert_eq!(spec.title.as_deref(), Some("MyTab"));
        assert_eq!(spec.cwd.as_deref(), Some(std::path::Path::new("/tmp")));
        assert_eq!(spec.command.as_deref(), Some("ls -la"));
    }

    #[test]
    fn tab_spec_command_only() {
        let spec = parse_tab_spec("htop");
        assert_eq!(spec.title, None);
        assert_eq!(spec.cwd, None);
        assert_eq!(spec.command.as_deref(), Some("htop"));
    }

    #[test]
    fn tab_spec_title_and_command() {
        let spec = parse_tab_spec("Logs  tail -f /var/log/syslog");
        assert_eq!(spec.title.as_deref(), Some("Logs"));
        assert_eq!(spec.cwd, None);
        assert_eq!(spec.command.as_deref(), Some("tail -f /var/log/syslog"));
    }

    #[test]
    fn tab_spec_empty_value_is_all_absent() {
        assert_eq!(parse_tab_spec(""), StartupTab::default());
    }

    #[test]
    fn tab_spec_missing_title_shifts_segments() {
        // A leading separator means "no title"; the rest parses as before.
        let spec = parse_tab_spec("  /tmp  ls");
        assert_eq!(spec.title, None);
        assert_eq!(spec.cwd.as_deref(), Some(std::path::Path::new("/tmp")));
        assert_eq!(spec.command.as_deref(), Some("ls"));
    }

    #[test]
    fn tab_spec_title_only_with_trailing_separator() {
        let spec = parse_tab_spec("JustTitle  ");
        assert_eq!(spec.title.as_deref(), Some("JustTitle"));
        assert_eq!(spec.cwd, None);
        assert_eq!(spec.command, None);
    }

    #[test]
    fn tab_spec_command_keeps_further_separators() {
        let spec = parse_tab_spec("T  /d  echo a  b");
        assert_eq!(spec.title.as_deref(), Some("T"));
        assert_eq!(spec.cwd.as_deref(), Some(std::path::Path::new("/d")));
        assert_eq!(spec.command.as_deref(), Some("echo a  b"));
    }

    #[test_case("80x24", Some((80, 24)) ; "standard")]
    #[test_case("132x43", Some((132, 43)) ; "wide")]
    #[test_case("80x", None ; "missing rows")]
    #[test_case("x24", None ; "missing cols")]
    #[test_case("0x24", None ; "zero cols")]
    #[test_case("80", None ; "no separator")]
    #[test_case("80x24+10+10", None ; "x11 offsets rejected")]
    fn geometry_parsing(input: &str, expected: Option<(u32, u32)>) {
        assert_eq!(parse_geometry(input), expected);
    }

    #[test]
    fn default_tab_created_without_tab_options() {
        let cli = Cli {
            execute: None,
            title: None,
            geometry: None,
            tabs: vec![],
        };
        let tabs = startup_tabs(&cli);
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0], StartupTab::default());
    }

    #[test]
    fn tab_options_replace_the_default_tab() {
        let cli = Cli {
            execute: None,
            title: None,
            geometry: None,
            tabs: vec!["one".into(), "two".into()],
        };
        let tabs = startup_tabs(&cli);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].command.as_deref(), Some("one"));
    }

    #[test]
    fn execute_adds_default_tab_before_tab_options() {
        let cli = Cli {
            execute: Some("htop".into()),
            title: None,
            geometry: None,
            tabs: vec!["extra".into()],
        };
        let tabs = startup_tabs(&cli);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].command.as_deref(), Some("htop"));
        assert_eq!(tabs[1].command.as_deref(), Some("extra"));
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from([
            "tabterm",
            "-e",
            "htop",
            "-t",
            "my title",
            "--geometry",
            "100x30",
            "--tab",
            "A  /tmp  ls",
            "--tab",
            "bash",
        ]);
        assert_eq!(cli.execute.as_deref(), Some("htop"));
        assert_eq!(cli.title.as_deref(), Some("my title"));
        assert_eq!(cli.geometry.as_deref(), Some("100x30"));
        assert_eq!(cli.tabs.len(), 2);
    }
}
