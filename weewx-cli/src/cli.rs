use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Confirm, Select, Text};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};
use weewx_core::{
    Config, ConfigStore, Forecast, Paths, Preferences, Radar, ResourceCache, SettingsSynchronizer,
    Station, TransportClient, TransportSettings,
};

/// Labels for `update_freq`, indexed by its value.
const UPDATE_CHOICES: [&str; 6] = [
    "Manual updates",
    "Every 5 minutes",
    "Every 10 minutes",
    "Every 15 minutes",
    "Every 30 minutes",
    "Every hour",
];

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weewx", version, about = "weeWX weather station client")]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG is used otherwise.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Edit preferences interactively, then sync with the settings URL.
    Configure,

    /// Re-apply the remote settings manifest using the saved preferences.
    Sync,

    /// Print the current conditions fields.
    Conditions {
        /// Ignore the cached copy.
        #[arg(long)]
        force: bool,
    },

    /// Print the forecast.
    Forecast {
        #[arg(long)]
        force: bool,
    },

    /// Save the radar image, or print the radar page URL.
    Radar {
        #[arg(long, default_value = "radar.gif")]
        out: PathBuf,
        #[arg(long)]
        force: bool,
    },

    /// Save the current webcam frame.
    Webcam {
        #[arg(long, default_value = "webcam.jpg")]
        out: PathBuf,
        #[arg(long)]
        force: bool,
    },

    /// Keep polling conditions and forecast until Ctrl-C.
    Watch,
}

/// Everything a command needs, wired once.
struct App {
    client: Arc<TransportClient>,
    store: ConfigStore,
    sync: SettingsSynchronizer,
    station: Station,
}

impl App {
    fn open() -> anyhow::Result<Self> {
        let paths = Paths::discover().context("could not locate config directories")?;
        paths
            .ensure()
            .context("could not create config and cache directories")?;

        let client = Arc::new(
            TransportClient::new(TransportSettings::new(&paths))
                .context("could not build the HTTP client")?,
        );
        let cache = Arc::new(ResourceCache::new(client.clone()));

        Ok(Self {
            store: ConfigStore::new(&paths),
            sync: SettingsSynchronizer::new(cache.clone(), paths.clone()),
            station: Station::new(cache, paths),
            client,
        })
    }

    fn config(&self) -> anyhow::Result<Config> {
        self.store.load().context("could not load configuration")
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let app = App::open()?;

        let token = app.client.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling requests");
                token.cancel();
            }
        });

        match self.command {
            Command::Configure => {
                let prefs = prompt_preferences(&app.config()?.preferences())?;
                synchronize(&app, &prefs).await?;
            }
            Command::Sync => {
                let cfg = app.config()?;
                if !cfg.saved {
                    bail!("no settings saved yet, run `weewx configure` first");
                }
                synchronize(&app, &cfg.preferences()).await?;
            }
            Command::Conditions { force } => {
                print_conditions(&app, &app.config()?, force).await?;
            }
            Command::Forecast { force } => {
                let forecast = app
                    .station
                    .forecast(&app.config()?, force)
                    .await
                    .context("could not load the forecast")?;
                print_forecast(&forecast);
            }
            Command::Radar { out, force } => {
                let radar = app
                    .station
                    .radar(&app.config()?, force)
                    .await
                    .context("could not load the radar")?;
                match radar {
                    Radar::Image(img) => {
                        tokio::fs::write(&out, &img.bytes)
                            .await
                            .with_context(|| format!("could not write {}", out.display()))?;
                        println!("{} ({}x{})", out.display(), img.width, img.height);
                    }
                    Radar::Webpage(url) => println!("{url}"),
                }
            }
            Command::Webcam { out, force } => {
                let img = app
                    .station
                    .webcam(&app.config()?, force)
                    .await
                    .context("could not load the webcam")?;
                tokio::fs::write(&out, &img.bytes)
                    .await
                    .with_context(|| format!("could not write {}", out.display()))?;
                println!("{} ({}x{})", out.display(), img.width, img.height);
            }
            Command::Watch => watch(&app).await?,
        }

        Ok(())
    }
}

fn prompt_preferences(current: &Preferences) -> anyhow::Result<Preferences> {
    let settings_url = Text::new("Settings URL:")
        .with_default(&current.settings_url)
        .prompt()?;
    let metric = Confirm::new("Use metric units?")
        .with_default(current.metric)
        .prompt()?;
    let use_icons = Confirm::new("Use forecast icons?")
        .with_default(current.use_icons)
        .prompt()?;
    let show_radar = Confirm::new("Show radar (instead of forecast)?")
        .with_default(current.show_radar)
        .prompt()?;
    let indoor_readings = Confirm::new("Show indoor readings?")
        .with_default(current.indoor_readings)
        .prompt()?;
    let dark_theme = Confirm::new("Dark theme?")
        .with_default(current.dark_theme)
        .prompt()?;
    let wifi_download = Confirm::new("Only download on wifi?")
        .with_default(current.wifi_download)
        .prompt()?;

    let update = Select::new("Update frequency:", UPDATE_CHOICES.to_vec())
        .with_starting_cursor(usize::from(current.update_freq).min(UPDATE_CHOICES.len() - 1))
        .prompt()?;
    let update_freq = UPDATE_CHOICES
        .iter()
        .position(|c| *c == update)
        .and_then(|i| u8::try_from(i).ok())
        .unwrap_or(1);

    Ok(Preferences {
        settings_url: settings_url.trim().to_string(),
        indoor_readings,
        dark_theme,
        metric,
        show_radar,
        use_icons,
        update_freq,
        wifi_download,
    })
}

async fn synchronize(app: &App, prefs: &Preferences) -> anyhow::Result<()> {
    let outcome = app
        .sync
        .synchronize(prefs)
        .await
        .context("settings were not applied")?;

    println!("Everything looks a-ok...");
    println!("  forecast: {}", outcome.provider);
    println!("  radar:    {} {}", outcome.rad_type, outcome.radar_url);
    if !outcome.refreshed.is_empty() {
        let kinds: Vec<_> = outcome.refreshed.iter().map(|k| k.as_str()).collect();
        println!("  refreshed: {}", kinds.join(", "));
    }
    if let Some(version) = outcome.icons_installed {
        println!("  icons installed (version {version})");
    }

    Ok(())
}

async fn print_conditions(app: &App, cfg: &Config, force: bool) -> anyhow::Result<()> {
    let reading = app
        .station
        .current_conditions(cfg, force)
        .await
        .context("could not load current conditions")?;

    if let Some(warning) = &reading.warning {
        eprintln!("warning: {warning}");
    }
    for (i, field) in reading.fields.iter().enumerate() {
        println!("{i:>3}: {field}");
    }

    Ok(())
}

fn print_forecast(forecast: &Forecast) {
    let when = forecast
        .fetched_at
        .map(|t| t.format("%d %b %Y %H:%M").to_string())
        .unwrap_or_default();

    println!("{} ({}) {}", forecast.summary, forecast.provider, when);
    for day in &forecast.days {
        println!(
            "{:<14} {:>6} {:>6}  {}",
            day.day,
            temp(day.min_temp),
            temp(day.max_temp),
            day.summary
        );
    }
}

fn temp(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

/// Poll interval for an `update_freq` value; `None` means manual.
fn poll_interval(update_freq: u8) -> Option<Duration> {
    let minutes = match update_freq {
        1 => 5,
        2 => 10,
        3 => 15,
        4 => 30,
        5 => 60,
        _ => return None,
    };
    Some(Duration::from_secs(minutes * 60))
}

async fn watch(app: &App) -> anyhow::Result<()> {
    let token = app.client.cancellation_token();

    loop {
        let cfg = app.config()?;
        let stamp = chrono::Local::now().format("%H:%M");
        println!("[{stamp}]");

        if let Err(e) = print_conditions(app, &cfg, false).await {
            warn!("{e:#}");
        }
        match app.station.forecast(&cfg, false).await {
            Ok(forecast) => print_forecast(&forecast),
            Err(e) => warn!("could not load the forecast: {e}"),
        }

        let Some(every) = poll_interval(cfg.update_freq) else {
            info!("updates are manual, not polling");
            return Ok(());
        };

        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = tokio::time::sleep(every) => {}
        }
    }
}
