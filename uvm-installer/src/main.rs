fn main() -> anyhow::Result<()> {
    uvm_installer::run()
}
