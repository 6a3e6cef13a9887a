use crate::errors::ExtractError;
use crate::markdown::{describe, parse_document, Block, Cell, Inline, Table};

/// How many top-level blocks of a PR body are searched for the updates table.
const TABLE_SEARCH_DEPTH: usize = 10;

const PACKAGE_HEADER: &str = "Package";
const CHANGE_HEADER: &str = "Change";
const VERSION_ARROW: &str = " -> ";

/// One row of the updates table, versions still as written in the PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRow {
    pub dependency_name: String,
    pub old_version: String,
    pub new_version: String,
}

/// Parses the updates table of a Renovate PR body.
///
/// The first column must be `Package`; the `Change` column may sit at any
/// position. Any row that does not have the expected shape fails the whole
/// table, so callers never see a partial list.
pub fn parse_update_table(body: &str) -> Result<Vec<UpdateRow>, ExtractError> {
    let blocks = parse_document(body);
    let table = blocks
        .iter()
        .take(TABLE_SEARCH_DEPTH)
        .find_map(|block| match block {
            Block::Table(table) => Some(table),
            _ => None,
        })
        .ok_or_else(|| ExtractError::table("no dependencies table found"))?;

    let change_column = locate_change_column(table)?;

    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| parse_row(row, change_column).map_err(|err| at_row(err, index)))
        .collect()
}

fn locate_change_column(table: &Table) -> Result<usize, ExtractError> {
    match table.head.first().and_then(|cell| cell_text(cell)) {
        Some(PACKAGE_HEADER) => {}
        Some(other) => {
            return Err(ExtractError::table(format!(
                "first column must be {PACKAGE_HEADER:?}, found {other:?}"
            )))
        }
        None => {
            return Err(ExtractError::table(format!(
                "first column must be {PACKAGE_HEADER:?}, found {}",
                table.head.first().map(|c| describe(c)).unwrap_or_else(|| "no columns".into())
            )))
        }
    }

    table
        .head
        .iter()
        .position(|cell| cell_text(cell) == Some(CHANGE_HEADER))
        .ok_or_else(|| ExtractError::table(format!("no {CHANGE_HEADER:?} column in table header")))
}

fn parse_row(row: &[Cell], change_column: usize) -> Result<UpdateRow, ExtractError> {
    let package = row
        .first()
        .ok_or_else(|| ExtractError::table("row has no cells"))?;
    let change = row.get(change_column).ok_or_else(|| {
        ExtractError::table(format!(
            "row has {} cells, {CHANGE_HEADER:?} column is #{}",
            row.len(),
            change_column + 1
        ))
    })?;

    let dependency_name = dependency_name(package)?;
    let (old_version, new_version) = version_change(change)?;
    Ok(UpdateRow {
        dependency_name,
        old_version,
        new_version,
    })
}

/// The name is the first inline of the cell, or the label of a leading link.
/// Trailing siblings after a link, e.g. `([source](..))`, are ignored.
fn dependency_name(cell: &[Inline]) -> Result<String, ExtractError> {
    let head = match cell {
        [only] => only,
        [link @ Inline::Link { .. }, ..] => link,
        _ => {
            return Err(ExtractError::table(format!(
                "expected package name or link in {PACKAGE_HEADER:?} column, got {}",
                describe(cell)
            )))
        }
    };

    let name_node = match head {
        Inline::Link { children, .. } => children.first(),
        other => Some(other),
    };

    match name_node {
        Some(Inline::Text(name)) | Some(Inline::Code(name)) => Ok(name.clone()),
        _ => Err(ExtractError::table(format!(
            "dependency name is not plain text: {}",
            describe(cell)
        ))),
    }
}

/// Expects `` `old` -> `new` ``, optionally wrapped in a single link.
fn version_change(cell: &[Inline]) -> Result<(String, String), ExtractError> {
    let sequence = match cell {
        [Inline::Link { children, .. }, ..] => children.as_slice(),
        other => other,
    };

    match sequence {
        [Inline::Code(old), Inline::Text(arrow), Inline::Code(new)] if arrow == VERSION_ARROW => {
            Ok((old.clone(), new.clone()))
        }
        _ => Err(ExtractError::table(format!(
            "expected `<old>` -> `<new>` in {CHANGE_HEADER:?} column, got {}",
            describe(sequence)
        ))),
    }
}

fn cell_text(cell: &[Inline]) -> Option<&str> {
    match cell {
        [Inline::Text(text)] => Some(text.as_str()),
        _ => None,
    }
}

fn at_row(err: ExtractError, index: usize) -> ExtractError {
    match err {
        ExtractError::MalformedUpdateTable(message) => {
            ExtractError::MalformedUpdateTable(format!("row {}: {message}", index + 1))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(table: &str) -> String {
        format!("This PR contains the following updates:\n\n{table}\n---\n\n### Release Notes\n")
    }

    #[test]
    fn parses_plain_and_linked_rows() {
        let body = body(
            "| Package | Change | Age |\n\
             |---|---|---|\n\
             | [lodash](https://lodash.com/) ([source](https://github.com/lodash/lodash)) | [`4.17.0` -> `4.17.21`](https://renovatebot.com/diffs/npm/lodash/4.17.0/4.17.21) | [![age](https://badges/age.svg)](https://docs.renovatebot.com/) |\n\
             | eslint | `8.1.0` -> `8.2.0` | |\n",
        );
        let rows = parse_update_table(&body).unwrap();
        assert_eq!(
            rows,
            vec![
                UpdateRow {
                    dependency_name: "lodash".into(),
                    old_version: "4.17.0".into(),
                    new_version: "4.17.21".into(),
                },
                UpdateRow {
                    dependency_name: "eslint".into(),
                    old_version: "8.1.0".into(),
                    new_version: "8.2.0".into(),
                },
            ]
        );
    }

    #[test]
    fn finds_change_column_by_header() {
        let body = body(
            "| Package | Type | Change |\n\
             |---|---|---|\n\
             | node | final | `14.21.3` -> `16.20.0` |\n",
        );
        let rows = parse_update_table(&body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dependency_name, "node");
        assert_eq!(rows[0].old_version, "14.21.3");
        assert_eq!(rows[0].new_version, "16.20.0");
    }

    #[test]
    fn plain_change_cell_and_code_package_parse() {
        let rows = parse_update_table("| Package | Change |\n|---|---|\n| `a` | `1.0.0` -> `1.0.1` |\n")
            .unwrap();
        assert_eq!(
            rows,
            vec![UpdateRow {
                dependency_name: "a".into(),
                old_version: "1.0.0".into(),
                new_version: "1.0.1".into(),
            }]
        );
    }

    #[test]
    fn missing_table_fails() {
        let err = parse_update_table("Nothing to see here.").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedUpdateTable(msg) if msg.contains("no dependencies table")));
    }

    #[test]
    fn first_column_must_be_package() {
        let body = body("| Dependency | Change |\n|---|---|\n| a | `1` -> `2` |\n");
        let err = parse_update_table(&body).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedUpdateTable(msg) if msg.contains("Dependency")));
    }

    #[test]
    fn missing_change_column_fails() {
        let body = body("| Package | Update |\n|---|---|\n| a | major |\n");
        assert!(parse_update_table(&body).is_err());
    }

    #[test]
    fn unexpected_change_shape_fails_whole_table() {
        let body = body(
            "| Package | Change |\n\
             |---|---|\n\
             | lodash | `4.17.0` -> `4.17.21` |\n\
             | react | `17.0.2` => `18.2.0` |\n",
        );
        let err = parse_update_table(&body).unwrap_err();
        let ExtractError::MalformedUpdateTable(message) = err else {
            panic!("expected malformed table");
        };
        assert!(message.starts_with("row 2:"), "{message}");
        assert!(message.contains("=>"), "{message}");
    }

    #[test]
    fn unwrapped_text_version_fails() {
        let body = body("| Package | Change |\n|---|---|\n| lodash | 4.17.0 -> 4.17.21 |\n");
        assert!(parse_update_table(&body).is_err());
    }

    #[test]
    fn emphasised_package_name_fails() {
        let body = body("| Package | Change |\n|---|---|\n| **lodash** | `1.0.0` -> `1.0.1` |\n");
        assert!(parse_update_table(&body).is_err());
    }

    #[test]
    fn header_only_table_has_no_rows() {
        let body = body("| Package | Change |\n|---|---|\n");
        assert!(parse_update_table(&body).unwrap().is_empty());
    }
}
