use eyre::{Context, Result};
use std::io::Write;

pub fn read_input(name: &str) -> Result<String> {
    eprint!("Please enter {name}: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .wrap_err("Failed to read from input")?;

    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

pub fn read_input_hidden(name: &str) -> Result<String> {
    rpassword::prompt_password(format!("Please enter {name}: "))
        .wrap_err("Failed to read from input")
}
