fn main() -> anyhow::Result<()> {
    agrilink_cli::run()
}
