use std::io::{BufRead, Lines, Write};

use tracing::debug;

use crate::mol::DynGraph;

use super::assemble::{CgrReader, ReaderOptions};
use super::ctab::{CtabParser, MolBlock};
use super::error::CgrError;
use super::is_color_kind;
use super::record::Collector;
use super::value::wrap_colors;
use super::writer::{CgrWriter, OutputFormat, WriterOptions};

const TERMINATOR: &str = "$$$$";

/// Name of a `> <name>` data item header.
fn item_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('>')?;
    let (_, rest) = rest.split_once('<')?;
    let (name, _) = rest.split_once('>')?;
    Some(name)
}

/// Streams condensed graphs out of an SD file.
///
/// A record that fails to parse yields one `Err` and reading resumes after
/// its `$$$$` terminator.
pub struct SdfReader<R> {
    lines: Lines<R>,
    line_no: usize,
    reader: CgrReader,
    at_boundary: bool,
    done: bool,
}

impl<R: BufRead> SdfReader<R> {
    pub fn new(input: R, options: ReaderOptions) -> Self {
        Self {
            lines: input.lines(),
            line_no: 0,
            reader: CgrReader::new(options),
            at_boundary: false,
            done: false,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, CgrError> {
        match self.lines.next() {
            None => Ok(None),
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
        }
    }

    fn read_block(&mut self) -> Result<Option<MolBlock>, CgrError> {
        let mut parser = CtabParser::new();
        let mut collector = Collector::new();
        let mut seen = false;
        let mut block = loop {
            let Some(line) = self.next_line()? else {
                if !seen {
                    return Ok(None);
                }
                self.at_boundary = true;
                return Err(CgrError::parse(self.line_no, "unexpected end of molecule block"));
            };
            if line.trim_end() == TERMINATOR {
                if !seen {
                    continue;
                }
                self.at_boundary = true;
                return Err(CgrError::parse(self.line_no, "record ended before M  END"));
            }
            seen |= !line.trim().is_empty();
            if let Some(block) = parser.feed(self.line_no, &line, &mut collector)? {
                break block;
            }
        };

        let mut item: Option<(String, Vec<String>)> = None;
        while let Some(line) = self.next_line()? {
            let line = line.trim_end();
            if line == TERMINATOR {
                break;
            }
            if line.starts_with('>') {
                store_item(&mut block, item.take());
                item = item_name(line).map(|name| (name.to_string(), Vec::new()));
            } else if line.is_empty() {
                store_item(&mut block, item.take());
            } else if let Some((_, values)) = item.as_mut() {
                values.push(line.to_string());
            }
        }
        store_item(&mut block, item);
        Ok(Some(block))
    }

    fn skip_record(&mut self) {
        loop {
            match self.next_line() {
                Ok(Some(line)) if line.trim_end() == TERMINATOR => return,
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => {
                    self.done = true;
                    return;
                }
            }
        }
    }
}

fn store_item(block: &mut MolBlock, item: Option<(String, Vec<String>)>) {
    let Some((name, values)) = item else { return };
    if is_color_kind(&name) {
        block.colors.insert(name, values);
    } else {
        block.meta.insert(name, values);
    }
}

impl<R: BufRead> Iterator for SdfReader<R> {
    type Item = Result<DynGraph, CgrError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_block() {
            Ok(None) => {
                self.done = true;
                None
            }
            Ok(Some(block)) => Some(self.reader.molecule(block)),
            Err(e) => {
                debug!(line = self.line_no, error = %e, "skipping SD record");
                if matches!(e, CgrError::Io { .. }) {
                    self.done = true;
                } else if !std::mem::take(&mut self.at_boundary) {
                    self.skip_record();
                }
                Some(Err(e))
            }
        }
    }
}

/// Writes condensed graphs as SD records. Always uses the MDL block format.
pub struct SdfWriter<W> {
    out: W,
    writer: CgrWriter,
}

impl<W: Write> SdfWriter<W> {
    pub fn new(out: W, options: WriterOptions) -> Self {
        let options = WriterOptions {
            format: OutputFormat::Mdl,
            ..options
        };
        Self {
            out,
            writer: CgrWriter::new(options),
        }
    }

    pub fn write(&mut self, g: &DynGraph) -> Result<(), CgrError> {
        let formatted = self.writer.format_graph(g);
        self.out.write_all(formatted.block.as_bytes())?;
        writeln!(self.out, "M  END")?;
        for (name, value) in &formatted.meta {
            writeln!(self.out, ">  <{name}>")?;
            writeln!(self.out, "{value}")?;
            writeln!(self.out)?;
        }
        for (name, value) in &formatted.colors {
            writeln!(self.out, ">  <{name}>")?;
            for line in wrap_colors(value) {
                writeln!(self.out, "{line}")?;
            }
            writeln!(self.out)?;
        }
        writeln!(self.out, "{TERMINATOR}")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CgrError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::DynAtom;
    use crate::bond::{BondOrder, DynBond};
    use crate::element::Element;
    use std::io::Cursor;

    const TWO_RECORDS: &str = "
  test

  2  1  0  0  0  0            999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  1  0  0
    1.5000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  2  0  0
  1  2  8  0  0  0  0
M  STY  1   1 DAT
M  SAL   1  2   1   2
M  SDT   1 dynbond
M  SED   1 2>1
M  END
>  <source>
patent 42

>  <PHTYP>
1 1:a 2:b

$$$$

  test

  1  0  0  0  0  0            999 V2000
    0.0000    0.0000    0.0000 N   0  0  0  0  0  0  0  0  0  0  0  0
M  END
$$$$
";

    fn read_all(text: &str) -> Vec<Result<DynGraph, CgrError>> {
        SdfReader::new(Cursor::new(text), ReaderOptions::default()).collect()
    }

    #[test]
    fn reads_records_with_data_items() {
        let graphs = read_all(TWO_RECORDS);
        assert_eq!(graphs.len(), 2);
        let first = graphs[0].as_ref().unwrap();
        assert_eq!(
            first.bond(1, 2).unwrap(),
            &DynBond::new(Some(BondOrder::Double), Some(BondOrder::Single))
        );
        assert_eq!(first.meta()["source"], "patent 42");
        assert_eq!(first.atom(2).unwrap().colors["PHTYP"][&1], "b");
        assert!(!first.meta().contains_key("PHTYP"));

        let second = graphs[1].as_ref().unwrap();
        assert_eq!(second.atom(1).unwrap().single_element(), Some(Element::N));
    }

    #[test]
    fn broken_record_is_skipped() {
        let text = TWO_RECORDS.replacen("    1.5000", "    x.5000", 1);
        let graphs = read_all(&text);
        assert_eq!(graphs.len(), 2);
        assert!(matches!(graphs[0], Err(CgrError::Parse { line: 6, .. })));
        assert!(graphs[1].is_ok());
    }

    #[test]
    fn empty_record_is_reported() {
        let text = format!(
            "\n\n\n  0  0  0  0  0  0            999 V2000\nM  END\n$$$${}",
            TWO_RECORDS
        );
        let graphs = read_all(&text);
        assert_eq!(graphs.len(), 3);
        assert!(matches!(graphs[0], Err(CgrError::EmptyMolecule)));
        assert!(graphs[1].is_ok());
    }

    #[test]
    fn truncated_record() {
        let text = "\n  test\n\n  1  0  0  0  0  0            999 V2000\n$$$$\n";
        let graphs = read_all(text);
        assert_eq!(graphs.len(), 1);
        assert!(graphs[0].is_err());
    }

    #[test]
    fn long_colors_values_round_trip() {
        let value = format!("{}+", "a".repeat(70));
        let mut atom = DynAtom::new(Element::C);
        atom.colors.entry("PHTYP".into()).or_default().insert(1, value.clone());
        atom.p_colors.entry("PHTYP".into()).or_default().insert(1, value.clone());
        let mut g = DynGraph::new();
        g.add_atom(atom);

        let mut writer = SdfWriter::new(Vec::new(), WriterOptions::default());
        writer.write(&g).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.contains(&format!(">  <PHTYP>\n1 1:{}+\n+\n\n", "a".repeat(70))));

        let graphs = read_all(&text);
        let read = graphs[0].as_ref().unwrap();
        assert_eq!(read.atom(1).unwrap().colors["PHTYP"][&1], value);
        assert_eq!(read, &g);
    }

    #[test]
    fn writes_records() {
        let mut g = DynGraph::new();
        let c = g.add_atom(DynAtom::new(Element::C));
        let o = g.add_atom(DynAtom::new(Element::O).with_position([1.5, 0.0, 0.0]));
        g.add_bond(c, o, DynBond::fixed(BondOrder::Double)).unwrap();
        g.meta_mut().insert("name".into(), "formaldehyde".into());

        let mut writer = SdfWriter::new(
            Vec::new(),
            WriterOptions {
                format: OutputFormat::Mrv,
                ..WriterOptions::default()
            },
        );
        writer.write(&g).unwrap();
        writer.write(&g).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text.matches("$$$$\n").count(), 2);
        assert!(text.contains("M  END\n>  <name>\nformaldehyde\n\n$$$$\n"));

        let graphs = read_all(&text);
        assert_eq!(graphs.len(), 2);
        for read in graphs {
            let read = read.unwrap();
            assert_eq!(read, g);
            assert_eq!(read.meta(), g.meta());
        }
    }
}
