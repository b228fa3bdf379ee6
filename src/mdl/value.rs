//! Value grammar shared by the extension records.
//!
//! A value is a comma separated list of tokens. A token is either a plain
//! label (the same on both sides) or `a>b`, a transition from the reagent
//! label `a` to the product label `b`.

use tracing::trace;

use crate::atom::{Hybridization, Multi, StereoMark};
use crate::bond::BondOrder;

/// A label that can appear in a record value. `n` (and for bonds `0`)
/// spells an absent value.
pub(crate) trait Label: Sized + Copy + PartialEq {
    /// `Some(None)` is an explicit absent label, `None` a malformed one.
    fn parse_label(s: &str) -> Option<Option<Self>>;

    fn write_label(self) -> String;

    fn absent_label() -> &'static str {
        "n"
    }
}

impl Label for BondOrder {
    fn parse_label(s: &str) -> Option<Option<Self>> {
        match s {
            "0" | "n" => Some(None),
            "s" => Some(Some(BondOrder::Any)),
            _ => s.parse::<u8>().ok().and_then(BondOrder::from_code).map(Some),
        }
    }

    fn write_label(self) -> String {
        self.code().to_string()
    }

    fn absent_label() -> &'static str {
        "0"
    }
}

impl Label for StereoMark {
    fn parse_label(s: &str) -> Option<Option<Self>> {
        if s == "n" {
            return Some(None);
        }
        StereoMark::from_label(s).map(Some)
    }

    fn write_label(self) -> String {
        self.label().to_string()
    }
}

impl Label for Hybridization {
    fn parse_label(s: &str) -> Option<Option<Self>> {
        if s == "n" {
            return Some(None);
        }
        s.parse::<u8>().ok().and_then(Hybridization::from_code).map(Some)
    }

    fn write_label(self) -> String {
        self.code().to_string()
    }
}

impl Label for u8 {
    fn parse_label(s: &str) -> Option<Option<Self>> {
        if s == "n" {
            return Some(None);
        }
        s.parse::<u8>().ok().map(Some)
    }

    fn write_label(self) -> String {
        self.to_string()
    }
}

fn write_opt<T: Label>(v: Option<T>) -> String {
    match v {
        Some(v) => v.write_label(),
        None => T::absent_label().to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sides<T> {
    pub reagent: Option<Multi<T>>,
    pub product: Option<Multi<T>>,
}

/// Decodes a static list value: one label, or several distinct labels
/// forming a superimposed list.
pub(crate) fn parse_list<T: Label>(value: &str) -> Option<Sides<T>> {
    let labels = value
        .split(',')
        .map(|t| T::parse_label(t.trim()))
        .collect::<Option<Vec<_>>>()?;
    if labels.len() == 1 {
        let v = Multi::Single(labels[0]?);
        return Some(Sides {
            reagent: Some(v.clone()),
            product: Some(v),
        });
    }
    let values = labels.into_iter().collect::<Option<Vec<T>>>()?;
    let list = Multi::distinct(values)?;
    Some(Sides {
        reagent: Some(list.clone()),
        product: Some(list),
    })
}

/// Decodes a transition value. Tokens that do not change are ignored; one
/// changing token gives scalar sides, several give parallel lists whose
/// pairs must all differ.
pub(crate) fn parse_transition<T: Label>(value: &str) -> Option<Sides<T>> {
    let mut pairs = Vec::new();
    for token in value.split(',') {
        let mut parts = token.trim().split('>');
        let first = parts.next()?;
        let last = parts.last().unwrap_or(first);
        let s = T::parse_label(first)?;
        let p = T::parse_label(last)?;
        if s != p {
            pairs.push((s, p));
        }
    }
    match pairs.len() {
        0 => None,
        1 => {
            let (s, p) = pairs[0];
            Some(Sides {
                reagent: s.map(Multi::Single),
                product: p.map(Multi::Single),
            })
        }
        _ => {
            for (i, pair) in pairs.iter().enumerate() {
                if pairs[..i].contains(pair) {
                    trace!(value, "ambiguous transition list");
                    return None;
                }
            }
            let (s, p): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
            Some(Sides {
                reagent: Some(Multi::List(s.into_iter().collect::<Option<Vec<_>>>()?)),
                product: Some(Multi::List(p.into_iter().collect::<Option<Vec<_>>>()?)),
            })
        }
    }
}

fn as_labels<T: Copy>(v: Option<&Multi<T>>) -> Vec<Option<T>> {
    match v {
        Some(m) => m.as_slice().iter().copied().map(Some).collect(),
        None => vec![None],
    }
}

/// Encodes a pair of side values. Returns the value and whether it is a
/// transition; `None` when there is nothing to record.
pub(crate) fn write_state<T: Label>(
    s: Option<&Multi<T>>,
    p: Option<&Multi<T>>,
) -> Option<(String, bool)> {
    let listed = s.is_some_and(Multi::is_list) || p.is_some_and(Multi::is_list);
    if listed {
        let s = as_labels(s);
        let p = as_labels(p);
        if s == p {
            let value = s.into_iter().map(write_opt).collect::<Vec<_>>().join(",");
            return Some((value, false));
        }
        let len = s.len().max(p.len());
        let tokens: Vec<String> = (0..len)
            .map(|i| (s.get(i).copied().flatten(), p.get(i).copied().flatten()))
            .filter(|(x, y)| x != y)
            .map(|(x, y)| format!("{}>{}", write_opt(x), write_opt(y)))
            .collect();
        return Some((tokens.join(","), true));
    }
    let s = s.and_then(Multi::first).copied();
    let p = p.and_then(Multi::first).copied();
    if s != p {
        Some((format!("{}>{}", write_opt(s), write_opt(p)), true))
    } else {
        s.map(|v| (v.write_label(), false))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AtomDelta {
    Charge(Multi<i8>, Multi<i8>),
    Shift([f64; 3]),
    Depth(i8),
}

pub(crate) fn parse_atom_delta(value: &str, base: i8) -> Option<AtomDelta> {
    let mut chars = value.chars();
    let key = chars.next()?;
    let rest = chars.as_str();
    match key {
        'c' => parse_charge(rest, base).map(|(s, p)| AtomDelta::Charge(s, p)),
        'x' => {
            let shift = rest
                .split(',')
                .map(|t| t.trim().parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()?;
            let [dx, dy, dz] = shift[..] else { return None };
            Some(AtomDelta::Shift([dx, dy, dz]))
        }
        'z' => rest.trim().parse::<i8>().ok().map(AtomDelta::Depth),
        _ => None,
    }
}

/// Charge delta grammar.
///
/// * `+d`: product is `base + d`.
/// * `0,d1,d2,…`: the same alternatives `base, base+d1, …` on both sides.
/// * `p0,s1,p1,s2,p2,…` (odd length): alternative `i` goes from
///   `base + s_i` to `base + p_i`, with `s_0 = 0`.
pub(crate) fn parse_charge(value: &str, base: i8) -> Option<(Multi<i8>, Multi<i8>)> {
    let diff = value
        .split(',')
        .map(|t| t.trim().parse::<i8>().ok())
        .collect::<Option<Vec<_>>>()?;
    let shifted = |d: &i8| base.checked_add(*d);
    match diff[..] {
        [] => None,
        [0] => None,
        [d] => Some((Multi::Single(base), Multi::Single(base.checked_add(d)?))),
        [0, ..] => {
            let all = diff.iter().map(shifted).collect::<Option<Vec<_>>>()?;
            let list = Multi::distinct(all)?;
            Some((list.clone(), list))
        }
        _ if diff.len() % 2 == 1 => {
            let mut s = vec![base];
            s.extend(diff.iter().skip(1).step_by(2).map(shifted).collect::<Option<Vec<_>>>()?);
            let p = diff.iter().step_by(2).map(shifted).collect::<Option<Vec<_>>>()?;
            let pairs: Vec<(i8, i8)> = s.iter().copied().zip(p.iter().copied()).collect();
            Multi::distinct(pairs)?;
            Some((Multi::List(s), Multi::List(p)))
        }
        _ => None,
    }
}

/// Encodes a charge change as the shortest matching delta grammar, with
/// `s[0]` as base; the writer puts that base in the charge column or, when
/// it does not fit, an `M  CHG` line. `None` when nothing changes or the
/// change cannot be expressed.
pub(crate) fn write_charge(s: &Multi<i8>, p: &Multi<i8>) -> Option<String> {
    let base = *s.first()?;
    if !s.is_list() && !p.is_list() {
        let p = *p.first()?;
        return (p != base).then(|| format!("c{:+}", p as i16 - base as i16));
    }
    let (s, p) = (s.as_slice(), p.as_slice());
    if s == p {
        if s.len() < 2 {
            return None;
        }
        let deltas: Vec<String> = s
            .iter()
            .skip(1)
            .map(|x| format!("{:+}", *x as i16 - base as i16))
            .collect();
        return Some(format!("c0,{}", deltas.join(",")));
    }
    if s.len() != p.len() || s[0] == p[0] {
        // a leading zero delta would read back as a uniform shift
        return None;
    }
    let mut deltas = vec![format!("{:+}", p[0] as i16 - base as i16)];
    for (x, y) in s.iter().zip(p).skip(1) {
        deltas.push(format!("{:+}", *x as i16 - base as i16));
        deltas.push(format!("{:+}", *y as i16 - base as i16));
    }
    Some(format!("c{}", deltas.join(",")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColorAssignment {
    pub atom: u32,
    pub population: u32,
    pub reagent: String,
    pub product: String,
}

/// Splits every line of a colors block so that it reads back unchanged:
/// the first piece holds 74 characters and the following ones 80, each
/// cut piece ending in `+`.
pub(crate) fn wrap_colors(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in value.lines() {
        let chars: Vec<char> = line.chars().collect();
        let mut rest = &chars[..];
        let mut width = 74;
        while rest.len() > width {
            let (head, tail) = rest.split_at(width);
            let mut chunk: String = head.iter().collect();
            chunk.push('+');
            out.push(chunk);
            rest = tail;
            width = 80;
        }
        out.push(rest.iter().collect());
    }
    out
}

/// Decodes a colors block of kind `kind`. A `dyn` prefixed kind carries
/// `reagent>product` values. Returns the plain kind and the assignments.
pub(crate) fn parse_colors(kind: &str, lines: &[String]) -> (String, Vec<ColorAssignment>) {
    let (plain, dynamic) = match kind.strip_prefix("dyn") {
        Some(k) => (k.to_string(), true),
        None => (kind.to_string(), false),
    };

    let mut joined = Vec::new();
    let mut pending = String::new();
    let mut continued = false;
    for line in lines {
        let len = line.chars().count();
        if (len == 81 || len == 75 && !continued) && line.ends_with('+') {
            pending.push_str(&line[..line.len() - 1]);
            continued = true;
        } else {
            pending.push_str(line);
            joined.push(std::mem::take(&mut pending));
            continued = false;
        }
    }
    if !pending.is_empty() {
        joined.push(pending);
    }

    let mut out = Vec::new();
    for block in &joined {
        let mut tokens = block.split_whitespace();
        let Some(population) = tokens.next().and_then(|t| t.parse::<u32>().ok()) else {
            continue;
        };
        for token in tokens {
            let Some((atom, value)) = token.split_once(':') else { continue };
            let Ok(atom) = atom.parse::<u32>() else { continue };
            let (reagent, product) = if dynamic {
                match value.split_once('>') {
                    Some((s, p)) => (s.to_string(), p.to_string()),
                    None => continue,
                }
            } else {
                (value.to_string(), value.to_string())
            };
            out.push(ColorAssignment {
                atom,
                population,
                reagent,
                product,
            });
        }
    }
    (plain, out)
}
