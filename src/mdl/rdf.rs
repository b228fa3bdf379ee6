use std::collections::BTreeMap;
use std::io::{BufRead, Lines, Write};

use tracing::{debug, trace};

use crate::container::ReactionContainer;

use super::assemble::{CgrReader, RawReaction, ReaderOptions};
use super::ctab::{int, CtabParser};
use super::error::CgrError;
use super::is_color_kind;
use super::record::Collector;
use super::value::wrap_colors;
use super::writer::{CgrWriter, OutputFormat, WriterOptions};

#[derive(Debug)]
enum RxnState {
    Start,
    Header(u8),
    Counts,
    AwaitMol,
    Mol(CtabParser),
    Done,
}

/// Line-fed parser of one `$RXN` block.
///
/// The reaction is finalized once the last declared component block has
/// been read; any further non-blank line is a [`CgrError::FinalizedFile`].
#[derive(Debug)]
pub struct RxnParser {
    state: RxnState,
    reactants: usize,
    products: usize,
    collector: Collector,
    raw: RawReaction,
}

impl Default for RxnParser {
    fn default() -> Self {
        Self {
            state: RxnState::Start,
            reactants: 0,
            products: 0,
            collector: Collector::new(),
            raw: RawReaction::default(),
        }
    }
}

impl RxnParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, RxnState::Done)
    }

    /// Consumes one line. Returns the reaction components once complete.
    pub fn feed(&mut self, line_no: usize, line: &str) -> Result<Option<RawReaction>, CgrError> {
        match &mut self.state {
            RxnState::Start => {
                if line.starts_with("$RXN") {
                    self.state = RxnState::Header(0);
                } else if !line.trim().is_empty() {
                    return Err(CgrError::parse(line_no, "expected $RXN"));
                }
            }
            RxnState::Header(n) => {
                self.state = if *n == 2 {
                    RxnState::Counts
                } else {
                    RxnState::Header(*n + 1)
                };
            }
            RxnState::Counts => {
                self.reactants = int(line_no, line, 0, 3, "reactant count")?;
                self.products = int(line_no, line, 3, 6, "product count")?;
                trace!(
                    reactants = self.reactants,
                    products = self.products,
                    "reaction header parsed"
                );
                if self.reactants + self.products == 0 {
                    return Ok(Some(self.finalize()));
                }
                self.state = RxnState::AwaitMol;
            }
            RxnState::AwaitMol => {
                if line.starts_with("$MOL") {
                    self.state = RxnState::Mol(CtabParser::new());
                } else if !line.trim().is_empty() {
                    return Err(CgrError::parse(line_no, "expected $MOL"));
                }
            }
            RxnState::Mol(parser) => {
                let Some(block) = parser.feed(line_no, line, &mut self.collector)? else {
                    return Ok(None);
                };
                if self.raw.reactants.len() < self.reactants {
                    self.raw.reactants.push(block);
                } else {
                    self.raw.products.push(block);
                }
                if self.raw.reactants.len() + self.raw.products.len()
                    == self.reactants + self.products
                {
                    return Ok(Some(self.finalize()));
                }
                self.state = RxnState::AwaitMol;
            }
            RxnState::Done => {
                if !line.trim().is_empty() {
                    return Err(CgrError::FinalizedFile);
                }
            }
        }
        Ok(None)
    }

    fn finalize(&mut self) -> RawReaction {
        self.state = RxnState::Done;
        self.collector.reset();
        std::mem::take(&mut self.raw)
    }
}

/// Parses a complete RXN text into a reaction.
pub fn read_rxn(text: &str, reader: &CgrReader) -> Result<ReactionContainer, CgrError> {
    let mut parser = RxnParser::new();
    let mut raw = None;
    let mut last = 0;
    for (n, line) in text.lines().enumerate() {
        last = n + 1;
        if let Some(done) = parser.feed(last, line)? {
            raw = Some(done);
        }
    }
    match raw {
        Some(raw) => reader.reaction(raw),
        None => Err(CgrError::parse(last, "unexpected end of reaction")),
    }
}

#[derive(Debug)]
enum RdfState {
    Preamble,
    Reaction(RxnParser),
    Data,
    Skip,
}

/// Streams reactions out of an RD file.
///
/// `$DTYPE`/`$DATUM` pairs after a reaction become its metadata; names of
/// the form `<colors kind>.<molecule index>` become per-molecule colors.
/// Molecule records (`$MFMT`) are skipped. A reaction that fails to parse
/// yields one `Err` and reading resumes at the next `$RFMT`.
pub struct RdfReader<R> {
    lines: Lines<R>,
    line_no: usize,
    reader: CgrReader,
    state: RdfState,
    pending: Option<RawReaction>,
    key: Option<String>,
    done: bool,
}

impl<R: BufRead> RdfReader<R> {
    pub fn new(input: R, options: ReaderOptions) -> Self {
        Self {
            lines: input.lines(),
            line_no: 0,
            reader: CgrReader::new(options),
            state: RdfState::Preamble,
            pending: None,
            key: None,
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

    fn take_pending(&mut self) -> Option<Result<ReactionContainer, CgrError>> {
        self.key = None;
        let raw = self.pending.take()?;
        Some(self.reader.reaction(raw))
    }

    fn data_line(&mut self, line: &str) {
        let Some(raw) = self.pending.as_mut() else { return };
        if let Some(name) = line.strip_prefix("$DTYPE") {
            self.key = Some(name.trim().to_string());
            return;
        }
        let Some(key) = self.key.as_deref() else { return };
        let kind = key.rsplit_once('.').map_or(key, |(kind, _)| kind);
        let map = if is_color_kind(kind) {
            &mut raw.colors
        } else {
            &mut raw.meta
        };
        if let Some(value) = line.strip_prefix("$DATUM") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            map.insert(key.to_string(), vec![value.to_string()]);
        } else if let Some(values) = map.get_mut(key) {
            values.push(line.to_string());
        }
    }
}

impl<R: BufRead> Iterator for RdfReader<R> {
    type Item = Result<ReactionContainer, CgrError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    if let RdfState::Reaction(_) = self.state {
                        return Some(Err(CgrError::parse(
                            self.line_no,
                            "unexpected end of reaction",
                        )));
                    }
                    return self.take_pending();
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if line.starts_with("$RFMT") || line.starts_with("$MFMT") {
                self.state = if line.starts_with("$RFMT") {
                    RdfState::Reaction(RxnParser::new())
                } else {
                    debug!(line = self.line_no, "skipping molecule record");
                    RdfState::Skip
                };
                if let Some(result) = self.take_pending() {
                    return Some(result);
                }
                continue;
            }

            match &mut self.state {
                RdfState::Preamble | RdfState::Skip => {}
                RdfState::Reaction(parser) => match parser.feed(self.line_no, &line) {
                    Ok(None) => {}
                    Ok(Some(raw)) => {
                        self.pending = Some(raw);
                        self.state = RdfState::Data;
                    }
                    Err(e) => {
                        debug!(line = self.line_no, error = %e, "skipping RD record");
                        self.state = RdfState::Skip;
                        return Some(Err(e));
                    }
                },
                RdfState::Data => self.data_line(&line),
            }
        }
        None
    }
}

/// Encodes every molecule of a reaction; returns the RXN text and the
/// colors blocks of each molecule.
fn format_reaction(
    writer: &CgrWriter,
    rc: &ReactionContainer,
) -> (String, Vec<BTreeMap<String, String>>) {
    let mut out = String::from("$RXN\n\n  cgrcrab\n\n");
    out.push_str(&format!("{:>3}{:>3}\n", rc.reactants.len(), rc.products.len()));
    let mut colors = Vec::new();
    for g in rc.molecules() {
        let formatted = writer.format_graph(g);
        out.push_str("$MOL\n");
        out.push_str(&formatted.block);
        out.push_str("M  END\n");
        colors.push(formatted.colors);
    }
    (out, colors)
}

/// Encodes a reaction as an RXN block. The writer's format is ignored;
/// component blocks are always MDL.
pub fn to_rxn_string(writer: &CgrWriter, rc: &ReactionContainer) -> String {
    let writer = CgrWriter::new(WriterOptions {
        format: OutputFormat::Mdl,
        ..writer.options()
    });
    format_reaction(&writer, rc).0
}

/// Writes reactions as RD file records.
pub struct RdfWriter<W> {
    out: W,
    writer: CgrWriter,
    header_written: bool,
}

impl<W: Write> RdfWriter<W> {
    pub fn new(out: W, options: WriterOptions) -> Self {
        let options = WriterOptions {
            format: OutputFormat::Mdl,
            ..options
        };
        Self {
            out,
            writer: CgrWriter::new(options),
            header_written: false,
        }
    }

    pub fn write(&mut self, rc: &ReactionContainer) -> Result<(), CgrError> {
        if !self.header_written {
            writeln!(self.out, "$RDFILE 1")?;
            writeln!(self.out, "$DATM")?;
            self.header_written = true;
        }
        let (rxn, colors) = format_reaction(&self.writer, rc);
        writeln!(self.out, "$RFMT")?;
        self.out.write_all(rxn.as_bytes())?;
        for (name, value) in &rc.meta {
            writeln!(self.out, "$DTYPE {name}")?;
            writeln!(self.out, "$DATUM {value}")?;
        }
        for (idx, blocks) in (1..).zip(&colors) {
            for (kind, value) in blocks {
                let mut lines = wrap_colors(value).into_iter();
                writeln!(self.out, "$DTYPE {kind}.{idx}")?;
                writeln!(self.out, "$DATUM {}", lines.next().unwrap_or_default())?;
                for line in lines {
                    writeln!(self.out, "{line}")?;
                }
            }
        }
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
    use crate::bond::{BondOrder, DynBond};
    use std::io::Cursor;

    const ESTERIFICATION: &str = "$RXN

  test

  2  1
$MOL

  test

  2  1  0  0  0  0            999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  1  0  0
    1.5000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  2  0  0
  1  2  1  0  0  0  0
M  END
$MOL

  test

  1  0  0  0  0  0            999 V2000
    3.0000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
M  END
$MOL

  test

  2  1  0  0  0  0            999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  1  0  0
    1.5000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  3  0  0
  1  2  1  0  0  0  0
M  END
";

    #[test]
    fn reads_components_in_order() {
        let rc = read_rxn(ESTERIFICATION, &CgrReader::default()).unwrap();
        assert_eq!(rc.reactants.len(), 2);
        assert_eq!(rc.products.len(), 1);
        // the unmapped reactant oxygen is numbered above the largest map
        assert!(rc.reactants[1].contains_atom(4));
        assert!(rc.products[0].contains_atom(3));
    }

    #[test]
    fn lines_after_the_last_block_are_rejected() {
        let text = format!("{ESTERIFICATION}\n$MOL\n");
        assert!(matches!(
            read_rxn(&text, &CgrReader::default()),
            Err(CgrError::FinalizedFile)
        ));
    }

    #[test]
    fn parser_reports_finalization() {
        let mut parser = RxnParser::new();
        let mut raw = None;
        for (n, line) in ESTERIFICATION.lines().enumerate() {
            if let Some(done) = parser.feed(n + 1, line).unwrap() {
                raw = Some(done);
            }
        }
        assert!(parser.is_finalized());
        assert_eq!(raw.unwrap().products.len(), 1);
        assert!(parser.feed(99, "   ").unwrap().is_none());
        assert!(matches!(parser.feed(100, "$MOL"), Err(CgrError::FinalizedFile)));
    }

    #[test]
    fn truncated_reaction() {
        let text: String = ESTERIFICATION.lines().take(12).collect::<Vec<_>>().join("\n");
        assert!(matches!(
            read_rxn(&text, &CgrReader::default()),
            Err(CgrError::Parse { .. })
        ));
    }

    #[test]
    fn rd_file_round_trip() {
        let mut rc = read_rxn(ESTERIFICATION, &CgrReader::default()).unwrap();
        rc.meta.insert("yield".into(), "87%".into());
        let atom = rc.products[0].atom_mut(1).unwrap();
        atom.colors.entry("FFTYP".into()).or_default().insert(1, "c3".into());
        atom.p_colors.entry("FFTYP".into()).or_default().insert(1, "c2".into());

        let mut writer = RdfWriter::new(Vec::new(), WriterOptions::default());
        writer.write(&rc).unwrap();
        writer.write(&rc).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.starts_with("$RDFILE 1\n$DATM\n$RFMT\n$RXN\n"));
        assert!(text.contains("$DTYPE yield\n$DATUM 87%\n"));
        assert!(text.contains("$DTYPE dynFFTYP.3\n$DATUM 1 1:c3>c2\n"));

        let read: Vec<_> = RdfReader::new(Cursor::new(text), ReaderOptions::default())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read.len(), 2);
        for other in &read {
            assert_eq!(other, &rc);
        }
        assert_eq!(
            read[0].products[0].bond(1, 3),
            Some(&DynBond::fixed(BondOrder::Single))
        );
    }

    #[test]
    fn broken_reaction_is_skipped() {
        let text = format!(
            "$RDFILE 1\n$DATM\n$RFMT\n$RXN\n\n\n\n  1  0\n$MOL\n\n\n\n  0  0  0  0  0  0            999 V2000\n$RFMT\n{ESTERIFICATION}$DTYPE note\n$DATUM first\nsecond\n"
        );
        let read: Vec<_> = RdfReader::new(Cursor::new(text), ReaderOptions::default()).collect();
        assert_eq!(read.len(), 2);
        assert!(matches!(read[0], Err(CgrError::EmptyMolecule)));
        let rc = read[1].as_ref().unwrap();
        assert_eq!(rc.meta["note"], "first\nsecond");
    }

    #[test]
    fn molecule_records_are_skipped() {
        let text = format!("$RDFILE 1\n$DATM\n$MFMT\n\n  x\n\n$RFMT\n{ESTERIFICATION}");
        let read: Vec<_> = RdfReader::new(Cursor::new(text), ReaderOptions::default())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read.len(), 1);
    }
}
