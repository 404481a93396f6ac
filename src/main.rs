use vesper_harness::cli;

fn main() -> miette::Result<()> {
    cli::run()
}
