fn main() {
    let command_line_interface = argcast::cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        // failure kind, offending token, target type — then a usage exit
        eprintln!("{error:#}");
        std::process::exit(2);
    }
}
