use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;

use crate::bayesnet::BayesNet;
use crate::error::{BnetError, Result};
use crate::values::PotArray;

// The .bif text format: `variable` blocks declaring state spaces and
// `probability` blocks carrying one row per parent-state combination.
// Classical files hold real literals, quantum files the same grammar
// with complex literals in a+bj form. Punctuation is treated as
// delimiters; row positions are resolved from the parenthesized
// parent-state names rather than file order.

fn tokenize(text: &str) -> Vec<String> {
    fn flush(cur: &mut String, toks: &mut Vec<String>) {
        if !cur.is_empty() {
            toks.push(std::mem::take(cur));
        }
    }
    let mut toks = Vec::new();
    let mut cur = String::new();
    for ch in text.chars() {
        match ch {
            '{' | '}' | '(' | ')' | ';' | '|' => {
                flush(&mut cur, &mut toks);
                toks.push(ch.to_string());
            }
            '[' | ']' | ',' => flush(&mut cur, &mut toks),
            c if c.is_whitespace() => flush(&mut cur, &mut toks),
            c => cur.push(c),
        }
    }
    flush(&mut cur, &mut toks);
    toks
}

struct Cursor<'a> {
    toks: &'a [String],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.toks.get(self.pos).map(|s| s.as_str())
    }

    fn next(&mut self) -> Result<&'a str> {
        let tok = self
            .peek()
            .ok_or_else(|| BnetError::Parse("unexpected end of input".into()))?;
        self.pos += 1;
        Ok(tok)
    }

    fn expect(&mut self, want: &str) -> Result<()> {
        let tok = self.next()?;
        if tok == want {
            Ok(())
        } else {
            Err(BnetError::Parse(format!(
                "expected '{}', found '{}'",
                want, tok
            )))
        }
    }

    fn take_until(&mut self, stop: &str) -> Result<Vec<&'a str>> {
        let mut out = Vec::new();
        loop {
            let tok = self.next()?;
            if tok == stop {
                return Ok(out);
            }
            out.push(tok);
        }
    }
}

enum Row<'a> {
    Table(Vec<&'a str>),
    Cond(Vec<&'a str>, Vec<&'a str>),
}

struct RawCpt<'a> {
    node: &'a str,
    parents: Vec<&'a str>,
    rows: Vec<Row<'a>>,
}

fn parse_amp(tok: &str, is_quantum: bool) -> Result<Complex64> {
    if let Ok(x) = tok.parse::<f64>() {
        return Ok(Complex64::new(x, 0.0));
    }
    if is_quantum {
        if let Ok(z) = tok.replace('j', "i").parse::<Complex64>() {
            return Ok(z);
        }
    }
    Err(BnetError::Parse(format!("bad probability literal '{}'", tok)))
}

fn lookup(net: &BayesNet, name: &str) -> Result<usize> {
    net.node_named(name)
        .ok_or_else(|| BnetError::Parse(format!("unknown variable '{}'", name)))
}

fn flat_index(idx_p: &[usize], s: usize, parent_sizes: &[usize], k: usize) -> usize {
    let mut f = 0;
    for (i, &sz) in parent_sizes.iter().enumerate() {
        f = f * sz + idx_p[i];
    }
    f * k + s
}

/// Parses BIF text into a network. `is_quantum` selects the element
/// type and permits complex literals.
pub fn parse_bif(text: &str, is_quantum: bool) -> Result<BayesNet> {
    let toks = tokenize(text);
    let mut cur = Cursor {
        toks: &toks,
        pos: 0,
    };
    let mut vars: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut cpts: Vec<RawCpt> = Vec::new();

    while let Some(tok) = cur.peek() {
        match tok {
            "network" => {
                cur.next()?;
                cur.next()?; // network name
                cur.expect("{")?;
                // both the self-closed header and the style wrapping
                // the whole file in the network block occur in the wild
                if cur.peek() == Some("}") {
                    cur.next()?;
                }
            }
            "variable" => {
                cur.next()?;
                let name = cur.next()?;
                cur.expect("{")?;
                cur.expect("type")?;
                cur.expect("discrete")?;
                let declared: usize = cur.next()?.parse().map_err(|_| {
                    BnetError::Parse(format!("bad state count for variable '{}'", name))
                })?;
                cur.expect("{")?;
                let states = cur.take_until("}")?;
                cur.expect(";")?;
                cur.expect("}")?;
                if states.len() != declared || states.is_empty() {
                    return Err(BnetError::Parse(format!(
                        "variable '{}' declares {} states but lists {}",
                        name,
                        declared,
                        states.len()
                    )));
                }
                if states.iter().collect::<BTreeSet<_>>().len() != states.len()
                    || vars.iter().any(|(n, _)| *n == name)
                {
                    return Err(BnetError::Parse(format!(
                        "duplicate name in variable '{}'",
                        name
                    )));
                }
                vars.push((name, states));
            }
            "probability" => {
                cur.next()?;
                cur.expect("(")?;
                let node = cur.next()?;
                let parents = match cur.next()? {
                    ")" => Vec::new(),
                    "|" => cur.take_until(")")?,
                    other => {
                        return Err(BnetError::Parse(format!(
                            "expected ')' or '|', found '{}'",
                            other
                        )))
                    }
                };
                cur.expect("{")?;
                let mut rows = Vec::new();
                loop {
                    match cur.next()? {
                        "}" => break,
                        "table" => rows.push(Row::Table(cur.take_until(";")?)),
                        "(" => {
                            let states = cur.take_until(")")?;
                            rows.push(Row::Cond(states, cur.take_until(";")?));
                        }
                        other => {
                            return Err(BnetError::Parse(format!(
                                "unexpected token '{}' in probability block",
                                other
                            )))
                        }
                    }
                }
                cpts.push(RawCpt {
                    node,
                    parents,
                    rows,
                });
            }
            "}" | ";" => {
                cur.next()?;
            }
            other => return Err(BnetError::Parse(format!("unexpected token '{}'", other))),
        }
    }

    let mut net = BayesNet::new();
    for (name, states) in &vars {
        net.add_node(name, states);
    }

    let mut resolved = Vec::with_capacity(cpts.len());
    for cpt in &cpts {
        let nd = lookup(&net, cpt.node)?;
        let parent_ids: Vec<usize> = cpt
            .parents
            .iter()
            .map(|p| lookup(&net, p))
            .collect::<Result<_>>()?;
        resolved.push((nd, parent_ids));
    }
    for (nd, parent_ids) in &resolved {
        for &p in parent_ids {
            net.add_edge(p, *nd)?;
        }
    }

    for ((nd, parent_ids), cpt) in resolved.iter().zip(&cpts) {
        let nd = *nd;
        let k = net.node(nd).size();
        let parent_sizes: Vec<usize> = parent_ids.iter().map(|&p| net.node(p).size()).collect();
        let mut shape = parent_sizes.clone();
        shape.push(k);
        let total: usize = shape.iter().product();
        let mut data = vec![Complex64::new(0.0, 0.0); total];

        for row in &cpt.rows {
            match row {
                Row::Table(vals) => {
                    if !parent_ids.is_empty() || vals.len() != k {
                        return Err(BnetError::Parse(format!(
                            "malformed table row for '{}'",
                            cpt.node
                        )));
                    }
                    for (s, tok) in vals.iter().enumerate() {
                        data[s] = parse_amp(tok, is_quantum)?;
                    }
                }
                Row::Cond(states, vals) => {
                    if states.len() != parent_ids.len() || vals.len() != k {
                        return Err(BnetError::Parse(format!(
                            "malformed conditional row for '{}'",
                            cpt.node
                        )));
                    }
                    let idx_p: Vec<usize> = states
                        .iter()
                        .zip(parent_ids)
                        .map(|(st, &p)| {
                            net.node(p).state_index(st).ok_or_else(|| {
                                BnetError::Parse(format!(
                                    "'{}' is not a state of '{}'",
                                    st,
                                    net.node(p).name()
                                ))
                            })
                        })
                        .collect::<Result<_>>()?;
                    for (s, tok) in vals.iter().enumerate() {
                        data[flat_index(&idx_p, s, &parent_sizes, k)] =
                            parse_amp(tok, is_quantum)?;
                    }
                }
            }
        }
        let expected_rows: usize = parent_sizes.iter().product();
        if cpt.rows.len() != expected_rows {
            return Err(BnetError::Parse(format!(
                "'{}' has {} rows but {} parent combinations",
                cpt.node,
                cpt.rows.len(),
                expected_rows
            )));
        }

        let arr = if is_quantum {
            PotArray::Complex(
                ArrayD::from_shape_vec(IxDyn(&shape), data)
                    .map_err(|e| BnetError::Parse(e.to_string()))?,
            )
        } else {
            PotArray::Real(
                ArrayD::from_shape_vec(IxDyn(&shape), data.iter().map(|c| c.re).collect())
                    .map_err(|e| BnetError::Parse(e.to_string()))?,
            )
        };
        net.set_potential(nd, parent_ids, arr)?;
    }

    Ok(net)
}

/// Reads a BIF file into a network.
pub fn read_bif(path: impl AsRef<Path>, is_quantum: bool) -> Result<BayesNet> {
    parse_bif(&fs::read_to_string(path)?, is_quantum)
}

fn fmt_amp(v: Complex64, is_quantum: bool) -> String {
    if !is_quantum {
        return format!("{}", v.re);
    }
    let im = if v.im == 0.0 { 0.0 } else { v.im };
    if im < 0.0 {
        format!("{}-{}j", v.re, -im)
    } else {
        format!("{}+{}j", v.re, im)
    }
}

/// Renders a network in BIF form; rows are emitted in cartesian
/// parent-state order. Nodes without potentials only get a
/// `variable` block.
pub fn bif_string(bnet: &BayesNet) -> String {
    let is_quantum = bnet.is_quantum();
    let mut out = String::from("network unknown { }\n\n");
    for node in bnet.nodes() {
        out.push_str(&format!("variable {} {{\n", node.name()));
        out.push_str(&format!(
            "  type discrete [ {} ] {{ {} }};\n}}\n",
            node.size(),
            node.state_names().join(", ")
        ));
    }
    for node in bnet.nodes() {
        let pot = match node.potential() {
            Some(p) => p.pot(),
            None => continue,
        };
        let ord = pot.ord_nodes();
        let parents = &ord[..ord.len() - 1];
        if parents.is_empty() {
            let vals = (0..node.size())
                .map(|s| fmt_amp(pot.value(&[s]), is_quantum))
                .join(", ");
            out.push_str(&format!(
                "probability ( {} ) {{\n  table {};\n}}\n",
                node.name(),
                vals
            ));
        } else {
            let parent_names = parents.iter().map(|&p| bnet.node(p).name()).join(", ");
            out.push_str(&format!(
                "probability ( {} | {} ) {{\n",
                node.name(),
                parent_names
            ));
            let combos = parents
                .iter()
                .map(|&p| 0..bnet.node(p).size())
                .multi_cartesian_product();
            for idx_p in combos {
                let state_names = idx_p
                    .iter()
                    .zip(parents)
                    .map(|(&st, &p)| bnet.node(p).state_names()[st].as_str())
                    .join(", ");
                let mut idx = idx_p.clone();
                idx.push(0);
                let last = idx.len() - 1;
                let vals = (0..node.size())
                    .map(|s| {
                        idx[last] = s;
                        fmt_amp(pot.value(&idx), is_quantum)
                    })
                    .join(", ");
                out.push_str(&format!("  ({}) {};\n", state_names, vals));
            }
            out.push_str("}\n");
        }
    }
    out
}

/// Writes a network to a BIF file. Complements [`read_bif`].
pub fn write_bif(bnet: &BayesNet, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, bif_string(bnet))?;
    Ok(())
}
