use serde_json::Value;
use std::io;

use super::plain;

type StdoutCsv<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout. A `result` object becomes `field,value`
/// rows; a `results` array becomes one row per item.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match value {
        Value::Object(map) => match (map.get("result"), map.get("results")) {
            (Some(Value::Object(result)), _) => write_fields(&mut wtr, result.iter()),
            (_, Some(Value::Array(rows))) => write_rows(&mut wtr, rows),
            _ => write_fields(&mut wtr, map.iter()),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        _ => wtr.write_record([plain(value)]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        tracing::error!("CSV write error: {}", e);
    }
}

fn write_fields<'a>(
    wtr: &mut StdoutCsv<'_>,
    fields: impl Iterator<Item = (&'a String, &'a Value)>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in fields {
        wtr.write_record([key.as_str(), &plain(val)])?;
    }
    Ok(())
}

fn write_rows(wtr: &mut StdoutCsv<'_>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            wtr.write_record([plain(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for item in rows {
        if let Value::Object(map) = item {
            wtr.write_record(
                headers
                    .iter()
                    .map(|h| map.get(*h).map(plain).unwrap_or_default()),
            )?;
        }
    }
    Ok(())
}
