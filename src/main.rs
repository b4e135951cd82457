fn main() -> anyhow::Result<()> {
    screenstudio_viewer::run()
}
