fn main() -> anyhow::Result<()> {
    portal_ngin::run()
}
