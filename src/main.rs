use clap::Parser;
use env_logger::Env;

fn main() -> miette::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    pixplot::App::parse().run()
}
