use bot_status::config::Config;
use bot_status::render::fonts::FontQuality;
use bot_status::render::Renderer;
use bot_status::{StatusReporter, StatusSnapshot};
use clap::Parser;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bot-status")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long, default_value = "./status.png")]
    output: String,
    #[arg(long)]
    print_default_config: bool,
    /// Render built-in sample data without touching the host.
    #[arg(long, conflicts_with = "json")]
    preview: bool,
    /// Print the collected snapshot as JSON instead of rendering it.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = if cli.preview && !Path::new(&cli.config).exists() {
        Config::new("preview")
    } else {
        match Config::load_from_file(&cli.config) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "не удалось загрузить конфигурацию");
                std::process::exit(1);
            }
        }
    };

    if cli.preview {
        let renderer = match Renderer::from_config(&cfg) {
            Ok(r) => r,
            Err(err) => {
                error!(error = %err, "не удалось подготовить отрисовку");
                std::process::exit(1);
            }
        };
        warn_if_degraded(renderer.font_quality());
        match renderer.render(&StatusSnapshot::preview()) {
            Ok(png) => write_output(&cli.output, &png),
            Err(err) => {
                error!(error = %err, "не удалось отрисовать превью");
                std::process::exit(1);
            }
        }
        return;
    }

    let reporter = match StatusReporter::from_config(&cfg) {
        Ok(r) => r,
        Err(err) => {
            error!(error = %err, "не удалось подготовить отчёт");
            std::process::exit(1);
        }
    };

    if cli.json {
        match reporter.collector().collect().await {
            Ok(snapshot) => match serde_json::to_string_pretty(&snapshot) {
                Ok(text) => println!("{text}"),
                Err(err) => {
                    error!(error = %err, "не удалось сериализовать снимок");
                    std::process::exit(1);
                }
            },
            Err(err) => {
                error!(error = %err, "не удалось собрать состояние");
                std::process::exit(1);
            }
        }
        return;
    }

    warn_if_degraded(reporter.renderer().font_quality());
    match reporter.generate_status_image().await {
        Ok(png) => write_output(&cli.output, &png),
        Err(err) => {
            error!(error = %err, "ошибка формирования изображения состояния");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn warn_if_degraded(quality: FontQuality) {
    if quality == FontQuality::Degraded {
        warn!("CJK-шрифт не найден: подписи будут отрисованы без иероглифов");
    }
}

fn write_output(path: &str, png: &[u8]) {
    if let Err(err) = fs::write(path, png) {
        error!(error = %err, path = %path, "не удалось записать файл");
        std::process::exit(1);
    }
    info!(path = %path, bytes = png.len(), "изображение сохранено");
}
