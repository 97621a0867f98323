use serde::Serialize;

use crate::error::Result;

#[derive(Serialize)]
struct JsonOut<T> {
    ok: bool,
    data: T,
}

pub fn print_out<T: Serialize>(json: bool, data: &[T], row: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&JsonOut { ok: true, data })?);
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(json: bool, data: T, row: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&JsonOut { ok: true, data })?);
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}
