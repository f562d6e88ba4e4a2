use std::{fmt::Display, io::Write, str::FromStr};

use nu_ansi_term::{AnsiGenericString, Color, Style};

pub fn prompt_cli(msg: impl AsRef<str>) -> std::io::Result<String> {
    print!("{} ", Color::Rgb(252, 186, 3).paint(msg.as_ref()));
    std::io::stdout().flush()?;

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input)? == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "stdin closed while waiting for input",
        ));
    }
    Ok(input.trim().to_owned())
}

/// Prompts the user for a yes/no answer.
/// Returns true if the answer starts with 'y' or 'Y', false otherwise.
pub fn prompt_continue(msg: Option<&str>) -> std::io::Result<bool> {
    Ok(prompt_cli(msg.unwrap_or("Do you want to continue? [y/N]"))?
        .to_lowercase()
        .starts_with('y'))
}

/// Asks until the answer parses as `T`. An empty answer selects `default` when one is given.
pub fn prompt_parsed<T>(msg: impl AsRef<str>, default: Option<T>) -> std::io::Result<T>
where
    T: FromStr + Display + Clone,
    T::Err: Display,
{
    let msg = match &default {
        Some(d) => format!("{} [{d}]:", msg.as_ref()),
        None => format!("{}:", msg.as_ref()),
    };
    loop {
        let input = prompt_cli(&msg)?;
        if input.is_empty() {
            if let Some(d) = &default {
                return Ok(d.to_owned());
            }
            continue;
        }
        match input.parse::<T>() {
            Ok(value) => return Ok(value),
            Err(e) => println!("{}", Color::Red.paint(e.to_string())),
        }
    }
}

/// Like [`prompt_parsed`], with an extra check applied to the parsed value.
pub fn prompt_validated<T, F>(
    msg: impl AsRef<str>,
    default: Option<T>,
    check: F,
) -> std::io::Result<T>
where
    T: FromStr + Display + Clone,
    T::Err: Display,
    F: Fn(&T) -> Result<(), String>,
{
    loop {
        let value = prompt_parsed(msg.as_ref(), default.clone())?;
        match check(&value) {
            Ok(()) => return Ok(value),
            Err(e) => println!("{}", Color::Red.paint(e)),
        }
    }
}

/// Lists `options` with 1-based numbers and returns the chosen index.
pub fn prompt_select(msg: impl AsRef<str>, options: &[String]) -> std::io::Result<usize> {
    println!("{}", bold(msg));
    for (i, option) in options.iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
    prompt_validated("Enter a number", None, |n: &usize| {
        parse_selection(*n, options.len()).map(|_| ())
    })
    .map(|n| n - 1)
}

pub fn parse_selection(choice: usize, len: usize) -> Result<usize, String> {
    if choice == 0 || choice > len {
        return Err(format!("please choose a number between 1 and {len}"));
    }
    Ok(choice - 1)
}

pub fn bold<'a>(msg: impl AsRef<str> + 'a) -> AnsiGenericString<'a, str> {
    Style::new().bold().paint(msg.as_ref().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_one_based() {
        assert_eq!(parse_selection(1, 3), Ok(0));
        assert_eq!(parse_selection(3, 3), Ok(2));
        assert!(parse_selection(0, 3).is_err());
        assert!(parse_selection(4, 3).is_err());
    }
}
