fn main() -> anyhow::Result<()> {
    strip::cli::run_cli()
}
