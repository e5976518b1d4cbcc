mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, Subcommand};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use listing_map::config::AppConfig;
use listing_map::data;
use listing_map::render::SvgRenderer;
use listing_map::Choropleth;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// GeoJSON dataset, overrides `[input] geojson`
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore the map in the terminal
    View,
    /// Write the map as an SVG document
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "listing-map.svg")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?;
    init_logging(&config.logging.file)?;

    let data_path = cli.data.clone().unwrap_or_else(|| config.input.geojson.clone());

    match cli.command.unwrap_or(Commands::View) {
        Commands::View => view(config, data_path),
        Commands::Export { output } => export(&config, &data_path, &output),
    }
}

/// Log to a file; stdout belongs to the terminal UI
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create log file: {:?}", path))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn export(config: &AppConfig, data_path: &Path, output: &Path) -> Result<()> {
    let features = data::load_features(data_path)?;
    let choropleth = Choropleth::new(config.choropleth(config.export_canvas()));
    let mut renderer = SvgRenderer::new(config.palette.legend_exponent, config.palette.legend_width);
    choropleth.run(features, &mut renderer)?;

    let document = renderer.into_document().context("Renderer produced no document")?;
    fs::write(output, document).with_context(|| format!("Failed to write SVG: {:?}", output))?;
    info!(output = %output.display(), "exported svg");
    println!("Wrote {}", output.display());
    Ok(())
}

fn view(config: AppConfig, data_path: PathBuf) -> Result<()> {
    // Load before touching the terminal so errors print normally
    let features = data::load_features(&data_path)?;

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, config, data_path, features);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => app.pointer_moved(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    config: AppConfig,
    data_path: PathBuf,
    features: Vec<data::Feature>,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, data_path, features, Rect::new(0, 0, size.width, size.height));

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                            KeyCode::Char('r') => {
                                if let Err(e) = app.reload() {
                                    error!("reload failed: {:#}", e);
                                    app.error = Some(format!("{:#}", e));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(Rect::new(0, 0, width, height)),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
