use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use parcel_engine::ImportRow;

const REQUIRED_COLUMNS: [&str; 4] = ["order_id", "client_name", "country", "status"];

/// Reads the rows of an import file.
///
/// `.json` files hold an array of rows. Anything else is treated as a spreadsheet export: a header row naming the
/// columns, then one order per line, separated by tabs (or commas when the header has no tabs). Quoted cells are not
/// supported, so export with tabs if a cell may contain a comma.
pub fn read_import_file(path: &Path) -> Result<Vec<ImportRow>> {
    let contents = fs::read_to_string(path).map_err(|e| anyhow!("Could not read {}. {e}", path.display()))?;
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&contents).map_err(|e| anyhow!("{} is not a valid list of orders. {e}", path.display()))
    } else {
        parse_delimited(&contents)
    }
}

pub fn parse_delimited(contents: &str) -> Result<Vec<ImportRow>> {
    let mut lines = contents.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| anyhow!("The import file is empty"))?;
    let delimiter = if header.contains('\t') { '\t' } else { ',' };
    let columns = header.split(delimiter).map(|c| c.trim().to_lowercase()).collect::<Vec<_>>();
    let missing = REQUIRED_COLUMNS.iter().filter(|c| !columns.iter().any(|col| col == *c)).copied().collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(anyhow!("The file is missing these columns: {}", missing.join(", ")));
    }
    let rows = lines
        .map(|line| {
            let cells = line.split(delimiter).map(str::trim).collect::<Vec<_>>();
            let cell = |name: &str| -> String {
                let index = columns.iter().position(|c| c == name);
                index.and_then(|i| cells.get(i)).map(|s| s.to_string()).unwrap_or_default()
            };
            let optional = |name: &str| Some(cell(name)).filter(|s| !s.is_empty());
            ImportRow {
                order_id: cell("order_id"),
                client_name: cell("client_name"),
                country: cell("country"),
                status: cell("status"),
                note: optional("note"),
                phone: optional("phone"),
            }
        })
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tab_separated_export() {
        let contents = "order_id\tclient_name\tcountry\tstatus\tnote\n\
                        CN-1001\t@alice_k, @bob_s\tCN\t🛒 Purchased\tfragile\n\
                        \n\
                        KR-7\tWalk-in\t\t🚚 Shipped to Kazakhstan\n";
        let rows = parse_delimited(contents).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].client_name, "@alice_k, @bob_s");
        assert_eq!(rows[0].note.as_deref(), Some("fragile"));
        assert_eq!(rows[1].country, "");
        assert_eq!(rows[1].note, None);
        assert_eq!(rows[1].phone, None);
    }

    #[test]
    fn columns_may_come_in_any_order() {
        let contents = "Status,Order_Id,Country,Client_Name,Phone\n📦 Packed,kr-3,KR,@dana,+7 701 123 45 67\n";
        let rows = parse_delimited(contents).unwrap();
        assert_eq!(rows[0].order_id, "kr-3");
        assert_eq!(rows[0].status, "📦 Packed");
        assert_eq!(rows[0].phone.as_deref(), Some("+7 701 123 45 67"));
    }

    #[test]
    fn missing_columns_are_named() {
        let err = parse_delimited("order_id,status\nCN-1,🛒 Purchased\n").unwrap_err();
        assert_eq!(err.to_string(), "The file is missing these columns: client_name, country");
        assert!(parse_delimited("\n\n").is_err());
    }
}
