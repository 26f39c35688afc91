//! Recovery of `if`, `if/else` and `while` shapes from jumps.
//!
//! The analysis runs once over a sealed function. It assigns each jump a
//! [`JumpRole`] and records the block markers (`else`, `end`, labels) that
//! precede each instruction index. Code generation then only consults the
//! result; it never looks at jump targets itself.

use std::collections::{BTreeSet, HashMap};

use crate::function::Function;

/// How code generation renders a jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpRole {
    /// Conditional jump opening `if <cond> then`.
    If,
    /// Conditional jump opening `while <cond> do`.
    While,
    /// Conditional jump with no recoverable shape: `if <cond> then goto ... end`.
    IfNotGoto,
    /// Unconditional jump with no recoverable shape: `goto ...`.
    Goto,
    /// Unconditional jump folded into a recovered block (loop back edge or
    /// the skip over an `else` branch). Emits nothing.
    Absorbed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    End,
    Else,
    Label(u32),
}

#[derive(Debug, Clone, Default)]
pub struct Structure {
    roles: HashMap<u32, JumpRole>,
    /// `markers[i]` precedes instruction `i`; the extra last slot follows the
    /// final instruction.
    markers: Vec<Vec<Marker>>,
}

/// Half-open instruction-index range.
type Region = (usize, usize);

fn nests(a: Region, b: Region) -> bool {
    let disjoint = a.1 <= b.0 || b.1 <= a.0;
    let a_in_b = b.0 <= a.0 && a.1 <= b.1;
    let b_in_a = a.0 <= b.0 && b.1 <= a.1;
    disjoint || a_in_b || b_in_a
}

struct Analyzer<'f> {
    func: &'f Function,
    index_of: HashMap<u32, usize>,
    incoming: Vec<u32>,
    regions: Vec<Region>,
    roles: HashMap<usize, JumpRole>,
    markers: Vec<Vec<Marker>>,
    labels: BTreeSet<usize>,
}

impl<'f> Analyzer<'f> {
    fn new(func: &'f Function) -> Self {
        let count = func.instructions.len();
        let mut index_of: HashMap<u32, usize> = func
            .instructions
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.header().address, i))
            .collect();
        index_of.insert(func.end, count);

        let mut analyzer = Self {
            func,
            index_of,
            incoming: vec![0; count + 1],
            regions: Vec::new(),
            roles: HashMap::new(),
            markers: vec![Vec::new(); count + 1],
            labels: BTreeSet::new(),
        };
        for i in 0..count {
            if let Some(t) = analyzer.local_target(i) {
                analyzer.incoming[t] += 1;
            }
        }
        analyzer
    }

    /// Index of the intra-function destination of the jump at `i`.
    fn local_target(&self, i: usize) -> Option<usize> {
        let inst = &self.func.instructions[i];
        if !(inst.is_cond_jump() || inst.is_uncond_jump()) {
            return None;
        }
        inst.dest_address().and_then(|dest| self.index_of.get(&dest).copied())
    }

    fn is_free_uncond(&self, i: usize) -> bool {
        self.func.instructions[i].is_uncond_jump() && !self.roles.contains_key(&i)
    }

    fn fits(&self, candidates: &[Region]) -> bool {
        candidates
            .iter()
            .all(|c| self.regions.iter().all(|r| nests(*c, *r)))
    }

    fn accept(&mut self, regions: &[Region]) {
        self.regions.extend_from_slice(regions);
    }

    fn try_while(&mut self, i: usize, t: usize) -> bool {
        if t < i + 2 || !self.is_free_uncond(t - 1) {
            return false;
        }
        let Some(h) = self.local_target(t - 1) else {
            return false;
        };
        if h > i || self.incoming[h] != 1 || self.incoming[t] != 1 {
            return false;
        }
        // The condition is re-evaluated every iteration, so the code that
        // computes it must not write anything.
        if self.func.instructions[h..i].iter().any(|inst| inst.emits_output()) {
            return false;
        }
        let region = (h, t);
        if !self.fits(&[region]) {
            return false;
        }
        self.accept(&[region]);
        self.roles.insert(i, JumpRole::While);
        self.roles.insert(t - 1, JumpRole::Absorbed);
        self.markers[t].insert(0, Marker::End);
        true
    }

    fn try_if_else(&mut self, i: usize, t: usize) -> bool {
        if t < i + 2 || !self.is_free_uncond(t - 1) {
            return false;
        }
        let Some(u) = self.local_target(t - 1) else {
            return false;
        };
        if u <= t || self.incoming[t] != 1 || self.incoming[u] != 1 {
            return false;
        }
        let regions = [(i, t), (t, u), (i, u)];
        if !self.fits(&regions) {
            return false;
        }
        self.accept(&regions);
        self.roles.insert(i, JumpRole::If);
        self.roles.insert(t - 1, JumpRole::Absorbed);
        self.markers[t].insert(0, Marker::Else);
        self.markers[u].insert(0, Marker::End);
        true
    }

    fn try_if(&mut self, i: usize, t: usize) -> bool {
        if self.incoming[t] != 1 {
            return false;
        }
        let region = (i, t);
        if !self.fits(&[region]) {
            return false;
        }
        self.accept(&[region]);
        self.roles.insert(i, JumpRole::If);
        self.markers[t].insert(0, Marker::End);
        true
    }

    fn run(mut self) -> Structure {
        for i in 0..self.func.instructions.len() {
            if self.roles.contains_key(&i) {
                continue;
            }
            let Some(t) = self.local_target(i) else {
                continue;
            };
            if self.func.instructions[i].is_cond_jump() {
                let structured = t > i && (self.try_while(i, t) || self.try_if_else(i, t) || self.try_if(i, t));
                if !structured {
                    self.roles.insert(i, JumpRole::IfNotGoto);
                    self.labels.insert(t);
                }
            } else {
                self.roles.insert(i, JumpRole::Goto);
                self.labels.insert(t);
            }
        }

        for &index in &self.labels {
            let address = self
                .func
                .instructions
                .get(index)
                .map_or(self.func.end, |inst| inst.header().address);
            self.markers[index].push(Marker::Label(address));
        }

        let roles = self
            .roles
            .into_iter()
            .map(|(i, role)| (self.func.instructions[i].header().address, role))
            .collect();
        Structure {
            roles,
            markers: self.markers,
        }
    }
}

impl Structure {
    pub fn analyze(func: &Function) -> Self {
        Analyzer::new(func).run()
    }

    pub fn role_at(&self, address: u32) -> Option<JumpRole> {
        self.roles.get(&address).copied()
    }

    /// Markers to emit before instruction `index` (or after the last
    /// instruction when `index` equals the instruction count).
    pub fn markers_before(&self, index: usize) -> &[Marker] {
        self.markers.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}
