// Minimal HTML table reader.
// Walks the document tag by tag and collects every <table> in document order,
// nested ones included, the same way a pandas-style table reader counts them.
// Cell text has tags stripped, entities decoded and whitespace collapsed.

use crate::ipea::objects::HtmlTable;

struct TableBuilder {
    index: usize,
    row: Option<Vec<String>>,
    row_all_th: bool,
    cell: Option<String>,
    cell_is_th: bool,
}

impl TableBuilder {
    fn new(index: usize) -> Self {
        TableBuilder {
            index,
            row: None,
            row_all_th: true,
            cell: None,
            cell_is_th: false,
        }
    }

    fn close_cell(&mut self) {
        if let Some(raw) = self.cell.take() {
            let text = normalize_ws(&decode_entities(&raw));
            let row = self.row.get_or_insert_with(Vec::new);
            row.push(text);
            self.row_all_th &= self.cell_is_th;
        }
    }

    fn close_row(&mut self, table: &mut HtmlTable) {
        self.close_cell();
        if let Some(row) = self.row.take() {
            if !row.is_empty() {
                // Rows made only of <th> cells are treated as the header,
                // as long as no data row came before them
                if self.row_all_th && table.header.is_empty() && table.rows.is_empty() {
                    table.header = row;
                } else {
                    table.rows.push(row);
                }
            }
        }
        self.row_all_th = true;
    }

    fn open_row(&mut self, table: &mut HtmlTable) {
        self.close_row(table);
        self.row = Some(Vec::new());
    }

    fn open_cell(&mut self, is_th: bool) {
        self.close_cell();
        if self.row.is_none() {
            self.row = Some(Vec::new());
        }
        self.cell = Some(String::new());
        self.cell_is_th = is_th;
    }
}

pub fn extract_tables(doc: &str) -> Vec<HtmlTable> {
    // ASCII lowercasing keeps byte offsets identical to `doc`
    let lower = doc.to_ascii_lowercase();
    let bytes = doc.as_bytes();

    let mut tables: Vec<HtmlTable> = Vec::new();
    let mut stack: Vec<TableBuilder> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let next_tag = match doc[i..].find('<') {
            Some(offset) => i + offset,
            None => doc.len(),
        };

        if next_tag > i {
            if let Some(top) = stack.last_mut() {
                if let Some(cell) = top.cell.as_mut() {
                    cell.push_str(&doc[i..next_tag]);
                }
            }
        }
        if next_tag >= doc.len() {
            break;
        }
        i = next_tag;

        if lower[i..].starts_with("<!--") {
            i = match lower[i + 4..].find("-->") {
                Some(end) => i + 4 + end + 3,
                None => doc.len(),
            };
            continue;
        }

        let tag_end = find_tag_end(bytes, i);
        let (closing, name) = tag_name(&lower[i..tag_end]);

        match (closing, name.as_str()) {
            (false, "script") | (false, "style") => {
                let close = format!("</{}", name);
                i = match lower[tag_end..].find(&close) {
                    Some(end) => find_tag_end(bytes, tag_end + end),
                    None => doc.len(),
                };
                continue;
            }
            (false, "table") => {
                tables.push(HtmlTable::default());
                stack.push(TableBuilder::new(tables.len() - 1));
            }
            (true, "table") => {
                if let Some(mut builder) = stack.pop() {
                    let index = builder.index;
                    builder.close_row(&mut tables[index]);
                }
            }
            (false, "tr") => {
                if let Some(top) = stack.last_mut() {
                    let index = top.index;
                    top.open_row(&mut tables[index]);
                }
            }
            (true, "tr") => {
                if let Some(top) = stack.last_mut() {
                    let index = top.index;
                    top.close_row(&mut tables[index]);
                }
            }
            (false, "td") | (false, "th") => {
                if let Some(top) = stack.last_mut() {
                    top.open_cell(name == "th");
                }
            }
            (true, "td") | (true, "th") => {
                if let Some(top) = stack.last_mut() {
                    top.close_cell();
                }
            }
            (false, "br") => {
                if let Some(cell) = stack.last_mut().and_then(|t| t.cell.as_mut()) {
                    cell.push(' ');
                }
            }
            _ => {}
        }

        i = tag_end;
    }

    // Unclosed tables at end of document still count
    while let Some(mut builder) = stack.pop() {
        let index = builder.index;
        builder.close_row(&mut tables[index]);
    }

    tables
}

// Index just past the '>' closing the tag that starts at `start`, skipping quoted attribute values
fn find_tag_end(bytes: &[u8], start: usize) -> usize {
    let mut in_single = false;
    let mut in_double = false;
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if !in_double => in_single = !in_single,
            b'"' if !in_single => in_double = !in_double,
            b'>' if !in_single && !in_double => return i + 1,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

fn tag_name(tag: &str) -> (bool, String) {
    let inner = tag.trim_start_matches('<');
    let (closing, rest) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (closing, name)
}

pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let decoded = after
            .find(';')
            .filter(|&semi| semi > 0 && semi <= 10)
            .and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "nbsp" => Some(' '),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

// Collapse runs of whitespace (including decoded &nbsp;) into one space and trim
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
