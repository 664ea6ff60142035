use planner_app::app::{run, AppConfig};

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run(AppConfig::from_env()) {
        eprintln!("Failed to build agenda: {err:#}");
        std::process::exit(1);
    }
}
