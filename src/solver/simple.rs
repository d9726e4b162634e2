//! Branch-and-bound search backend.
//!
//! # Algorithm
//!
//! 1. Exactly-one constraints over disjoint boolean variables become
//!    *groups*; everything else becomes a bounded linear row.
//! 2. Bounds propagation runs every row and group to a fixpoint. Row
//!    activity bounds are group aware: inside a group at most one term
//!    contributes, so a group adds the min/max of its open coefficients
//!    (or 0 when some open member lies outside the row) instead of the sum.
//! 3. Depth-first search branches on the open group with the fewest open
//!    members, trying each member as the chosen one in creation order.
//!    Remaining integer variables are split at their lower bound.
//! 4. Each improving solution tightens an objective cut `obj ≤ best - 1`
//!    that prunes the rest of the search.
//!
//! The search is exact: when it finishes within the budget the returned
//! solution is optimal, or the model is infeasible.
//!
//! # Reference
//! - Achterberg (2007), "Constraint Integer Programming", Ch. 7 (domain propagation)
//! - Land & Doig (1960), "An Automatic Method of Solving Discrete Programming Problems"

use log::{debug, warn};
use std::time::Instant;

use super::{Constraint, CpModel, CpSolution, CpSolver, SolveStatus, SolverConfig, VarKind};

/// Nodes between deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 64;

/// Exact depth-first branch-and-bound solver.
///
/// # Example
/// ```
/// use u_truckpack::solver::{CpModel, CpSolver, LinearExpr, SimpleCpSolver, SolveStatus, SolverConfig};
///
/// let mut model = CpModel::new("pick");
/// let a = model.new_bool_var("a");
/// let b = model.new_bool_var("b");
/// model.add_exactly_one([a, b]);
/// model.minimize(LinearExpr::new().with_term(a, 5).with_term(b, 2));
///
/// let solution = SimpleCpSolver::new().solve(&model, &SolverConfig::default());
/// assert_eq!(solution.status, SolveStatus::Optimal);
/// assert!(solution.bool_value(b));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleCpSolver;

impl SimpleCpSolver {
    /// Creates a solver.
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for SimpleCpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let start = Instant::now();

        if let Err(reason) = model.validate() {
            warn!("Model '{}' rejected: {}", model.name(), reason);
            return CpSolution::without_solution(SolveStatus::ModelInvalid, 0, 0);
        }

        let mut search = Search::new(model, config.deadline(start));
        search.run();

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = match (&search.best, search.timed_out) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::Unknown,
        };
        debug!(
            "Model '{}': {:?} after {} nodes in {}ms",
            model.name(),
            status,
            search.nodes,
            elapsed_ms
        );

        match search.best {
            Some((values, objective)) => CpSolution {
                status,
                values,
                objective_value: model.objective().map(|_| objective),
                elapsed_ms,
                nodes: search.nodes,
            },
            None => CpSolution::without_solution(status, elapsed_ms, search.nodes),
        }
    }
}

/// Propagation failure; the current node has no solution.
#[derive(Debug)]
struct Conflict;

type Propagation = Result<(), Conflict>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

enum Decision {
    Group(usize),
    Var(usize),
}

/// Run of row terms sharing a group (or all ungrouped terms).
#[derive(Debug, Clone, Copy)]
struct Segment {
    group: Option<usize>,
    start: usize,
    end: usize,
}

/// lo ≤ Σ coef·var ≤ hi, constant folded into the bounds.
#[derive(Debug, Clone)]
struct Row {
    terms: Vec<(usize, i64)>,
    segments: Vec<Segment>,
    lo: i64,
    hi: i64,
}

struct Search {
    lo: Vec<i64>,
    hi: Vec<i64>,
    is_bool: Vec<bool>,
    trail: Vec<(usize, i64, i64)>,

    group_of: Vec<Option<usize>>,
    groups: Vec<Vec<usize>>,
    group_free: Vec<usize>,
    group_true: Vec<Option<usize>>,

    rows: Vec<Row>,
    var_rows: Vec<Vec<usize>>,
    objective_row: Option<usize>,
    objective_constant: i64,

    row_queue: Vec<usize>,
    row_queued: Vec<bool>,
    group_queue: Vec<usize>,
    group_queued: Vec<bool>,

    root_conflict: bool,
    deadline: Option<Instant>,
    nodes: u64,
    timed_out: bool,
    best: Option<(Vec<i64>, i64)>,
}

impl Search {
    fn new(model: &CpModel, deadline: Option<Instant>) -> Self {
        let var_count = model.var_count();
        let lo: Vec<i64> = model.variables().iter().map(|v| v.lo).collect();
        let hi: Vec<i64> = model.variables().iter().map(|v| v.hi).collect();
        let is_bool = model
            .variables()
            .iter()
            .map(|v| v.kind == VarKind::Bool)
            .collect();

        let mut group_of = vec![None; var_count];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut linear: Vec<(Vec<(usize, i64)>, i64, i64)> = Vec::new();

        for constraint in model.constraints() {
            match constraint {
                Constraint::ExactlyOne(vars) => {
                    let mut members: Vec<usize> = vars.iter().map(|v| v.index()).collect();
                    members.sort_unstable();
                    members.dedup();
                    let disjoint = members.len() == vars.len()
                        && members.iter().all(|v| group_of[*v].is_none());
                    if disjoint {
                        let g = groups.len();
                        for v in &members {
                            group_of[*v] = Some(g);
                        }
                        // Creation order is the value order during search
                        groups.push(vars.iter().map(|v| v.index()).collect());
                    } else {
                        let mut terms: Vec<(usize, i64)> = Vec::new();
                        for v in vars {
                            match terms.iter_mut().find(|(t, _)| *t == v.index()) {
                                Some(term) => term.1 += 1,
                                None => terms.push((v.index(), 1)),
                            }
                        }
                        linear.push((terms, 1, 1));
                    }
                }
                Constraint::Linear { expr, lo, hi } => {
                    let constant = expr.constant_value();
                    linear.push((
                        expr.terms().map(|(v, c)| (v.index(), c)).collect(),
                        shift_bound(*lo, constant),
                        shift_bound(*hi, constant),
                    ));
                }
            }
        }

        let mut objective_constant = 0;
        let mut objective_row = None;
        if let Some(objective) = model.objective() {
            objective_constant = objective.constant_value();
            objective_row = Some(linear.len());
            linear.push((
                objective.terms().map(|(v, c)| (v.index(), c)).collect(),
                i64::MIN,
                i64::MAX,
            ));
        }

        let mut var_rows = vec![Vec::new(); var_count];
        let rows: Vec<Row> = linear
            .into_iter()
            .enumerate()
            .map(|(r, (mut terms, lo, hi))| {
                terms.sort_by_key(|(v, _)| (group_of[*v], *v));
                for (v, _) in &terms {
                    var_rows[*v].push(r);
                }
                let segments = segment_terms(&terms, &group_of);
                Row {
                    terms,
                    segments,
                    lo,
                    hi,
                }
            })
            .collect();

        let mut group_free = vec![0; groups.len()];
        let mut group_true = vec![None; groups.len()];
        let mut root_conflict = false;
        for (g, members) in groups.iter().enumerate() {
            for &v in members {
                if lo[v] < hi[v] {
                    group_free[g] += 1;
                } else if lo[v] == 1 {
                    if group_true[g].is_some() {
                        root_conflict = true;
                    }
                    group_true[g] = Some(v);
                }
            }
        }

        let row_count = rows.len();
        let group_count = groups.len();
        Self {
            lo,
            hi,
            is_bool,
            trail: Vec::new(),
            group_of,
            groups,
            group_free,
            group_true,
            rows,
            var_rows,
            objective_row,
            objective_constant,
            row_queue: Vec::new(),
            row_queued: vec![false; row_count],
            group_queue: Vec::new(),
            group_queued: vec![false; group_count],
            root_conflict,
            deadline,
            nodes: 0,
            timed_out: false,
            best: None,
        }
    }

    fn run(&mut self) {
        if self.root_conflict {
            return;
        }
        for r in 0..self.rows.len() {
            self.enqueue_row(r);
        }
        for g in 0..self.groups.len() {
            self.enqueue_group(g);
        }
        self.search();
    }

    fn search(&mut self) -> Flow {
        self.nodes += 1;
        if self.nodes % DEADLINE_CHECK_INTERVAL == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.timed_out = true;
                    return Flow::Stop;
                }
            }
        }

        if let Some(r) = self.objective_row {
            self.enqueue_row(r);
        }
        if self.propagate().is_err() {
            return Flow::Continue;
        }

        match self.pick_decision() {
            None => self.record_solution(),
            Some(Decision::Group(g)) => {
                for i in 0..self.groups[g].len() {
                    let var = self.groups[g][i];
                    if self.lo[var] == self.hi[var] {
                        continue;
                    }
                    if self.branch(var, 1, 1) == Flow::Stop {
                        return Flow::Stop;
                    }
                }
                Flow::Continue
            }
            Some(Decision::Var(var)) => {
                let (lo, hi) = (self.lo[var], self.hi[var]);
                let branches = if self.is_bool[var] {
                    [(hi, hi), (lo, lo)]
                } else {
                    [(lo, lo), (lo + 1, hi)]
                };
                for (b_lo, b_hi) in branches {
                    if self.branch(var, b_lo, b_hi) == Flow::Stop {
                        return Flow::Stop;
                    }
                }
                Flow::Continue
            }
        }
    }

    fn branch(&mut self, var: usize, lo: i64, hi: i64) -> Flow {
        let mark = self.trail.len();
        let flow = match self.tighten(var, lo, hi) {
            Ok(()) => self.search(),
            Err(Conflict) => Flow::Continue,
        };
        self.undo(mark);
        flow
    }

    fn pick_decision(&self) -> Option<Decision> {
        let open_group = (0..self.groups.len())
            .filter(|&g| self.group_true[g].is_none() && self.group_free[g] > 0)
            .min_by_key(|&g| self.group_free[g]);
        if let Some(g) = open_group {
            return Some(Decision::Group(g));
        }
        (0..self.lo.len())
            .find(|&v| self.lo[v] < self.hi[v])
            .map(Decision::Var)
    }

    fn record_solution(&mut self) -> Flow {
        if !self.is_consistent() {
            return Flow::Continue;
        }
        let objective = match self.objective_row {
            Some(r) => self.row_value(r) + self.objective_constant,
            None => 0,
        };
        self.best = Some((self.lo.clone(), objective));

        match self.objective_row {
            Some(r) => {
                // Globally valid cut: only strictly better solutions remain
                self.rows[r].hi = objective - self.objective_constant - 1;
                Flow::Continue
            }
            None => Flow::Stop,
        }
    }

    fn is_consistent(&self) -> bool {
        let rows_ok = self.rows.iter().enumerate().all(|(r, row)| {
            Some(r) == self.objective_row || {
                let value = self.row_value(r);
                row.lo <= value && value <= row.hi
            }
        });
        let groups_ok = self
            .groups
            .iter()
            .all(|members| members.iter().filter(|v| self.lo[**v] == 1).count() == 1);
        rows_ok && groups_ok
    }

    fn row_value(&self, r: usize) -> i64 {
        self.rows[r]
            .terms
            .iter()
            .map(|(v, c)| c * self.lo[*v])
            .sum()
    }

    // --- domain updates ---

    fn tighten(&mut self, var: usize, lo: i64, hi: i64) -> Propagation {
        let (old_lo, old_hi) = (self.lo[var], self.hi[var]);
        let new_lo = old_lo.max(lo);
        let new_hi = old_hi.min(hi);
        if new_lo > new_hi {
            return Err(Conflict);
        }
        if new_lo == old_lo && new_hi == old_hi {
            return Ok(());
        }

        self.trail.push((var, old_lo, old_hi));
        self.lo[var] = new_lo;
        self.hi[var] = new_hi;

        let mut conflict = false;
        if old_lo < old_hi && new_lo == new_hi {
            if let Some(g) = self.group_of[var] {
                self.group_free[g] -= 1;
                if new_lo == 1 {
                    match self.group_true[g] {
                        Some(_) => conflict = true,
                        None => self.group_true[g] = Some(var),
                    }
                }
                self.enqueue_group(g);
            }
        }

        for &r in &self.var_rows[var] {
            if !self.row_queued[r] {
                self.row_queued[r] = true;
                self.row_queue.push(r);
            }
        }

        if conflict {
            Err(Conflict)
        } else {
            Ok(())
        }
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some((var, old_lo, old_hi)) = self.trail.pop() else {
                break;
            };
            if old_lo < old_hi && self.lo[var] == self.hi[var] {
                if let Some(g) = self.group_of[var] {
                    self.group_free[g] += 1;
                    if self.group_true[g] == Some(var) {
                        self.group_true[g] = None;
                    }
                }
            }
            self.lo[var] = old_lo;
            self.hi[var] = old_hi;
        }

        for r in self.row_queue.drain(..) {
            self.row_queued[r] = false;
        }
        for g in self.group_queue.drain(..) {
            self.group_queued[g] = false;
        }
    }

    fn enqueue_row(&mut self, r: usize) {
        if !self.row_queued[r] {
            self.row_queued[r] = true;
            self.row_queue.push(r);
        }
    }

    fn enqueue_group(&mut self, g: usize) {
        if !self.group_queued[g] {
            self.group_queued[g] = true;
            self.group_queue.push(g);
        }
    }

    // --- propagation ---

    fn propagate(&mut self) -> Propagation {
        loop {
            if let Some(g) = self.group_queue.pop() {
                self.group_queued[g] = false;
                self.propagate_group(g)?;
            } else if let Some(r) = self.row_queue.pop() {
                self.row_queued[r] = false;
                self.propagate_row(r)?;
            } else {
                return Ok(());
            }
        }
    }

    fn propagate_group(&mut self, g: usize) -> Propagation {
        match self.group_true[g] {
            Some(chosen) => {
                for i in 0..self.groups[g].len() {
                    let var = self.groups[g][i];
                    if var != chosen {
                        self.tighten(var, 0, 0)?;
                    }
                }
                Ok(())
            }
            None => match self.group_free[g] {
                0 => Err(Conflict),
                1 => {
                    let last = self.groups[g]
                        .iter()
                        .copied()
                        .find(|&v| self.lo[v] < self.hi[v]);
                    match last {
                        Some(var) => self.tighten(var, 1, 1),
                        None => Err(Conflict),
                    }
                }
                _ => Ok(()),
            },
        }
    }

    fn propagate_row(&mut self, r: usize) -> Propagation {
        let (row_lo, row_hi) = (self.rows[r].lo, self.rows[r].hi);
        let mut min_act: i64 = 0;
        let mut max_act: i64 = 0;
        for s in 0..self.rows[r].segments.len() {
            let (seg_min, seg_max) = self.segment_bounds(r, s);
            min_act = min_act.saturating_add(seg_min);
            max_act = max_act.saturating_add(seg_max);
        }
        if min_act > row_hi || max_act < row_lo {
            return Err(Conflict);
        }

        for s in 0..self.rows[r].segments.len() {
            let seg = self.rows[r].segments[s];
            match seg.group {
                None => {
                    for i in seg.start..seg.end {
                        let (var, coef) = self.rows[r].terms[i];
                        if self.lo[var] == self.hi[var] {
                            continue;
                        }
                        let (term_min, term_max) = term_bounds(coef, self.lo[var], self.hi[var]);
                        let rest_min = min_act.saturating_sub(term_min);
                        let rest_max = max_act.saturating_sub(term_max);
                        let (lo, hi) = implied_bounds(coef, row_lo, row_hi, rest_min, rest_max);
                        self.tighten(var, lo, hi)?;
                    }
                }
                Some(g) => {
                    if self.group_true[g].is_some() {
                        continue;
                    }
                    let (seg_min, seg_max) = self.segment_bounds(r, s);
                    let others_min = min_act.saturating_sub(seg_min);
                    let others_max = max_act.saturating_sub(seg_max);
                    for i in seg.start..seg.end {
                        let (var, coef) = self.rows[r].terms[i];
                        if self.lo[var] == self.hi[var] {
                            continue;
                        }
                        // Choosing this member makes it the group's only contribution
                        if others_min.saturating_add(coef) > row_hi
                            || others_max.saturating_add(coef) < row_lo
                        {
                            self.tighten(var, 0, 0)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn segment_bounds(&self, r: usize, s: usize) -> (i64, i64) {
        let row = &self.rows[r];
        let seg = row.segments[s];
        let terms = &row.terms[seg.start..seg.end];

        let Some(g) = seg.group else {
            return terms.iter().fold((0i64, 0i64), |(mn, mx), &(v, c)| {
                let (t_min, t_max) = term_bounds(c, self.lo[v], self.hi[v]);
                (mn.saturating_add(t_min), mx.saturating_add(t_max))
            });
        };

        if let Some(chosen) = self.group_true[g] {
            let coef = terms
                .iter()
                .find(|(v, _)| *v == chosen)
                .map_or(0, |(_, c)| *c);
            return (coef, coef);
        }

        let mut open = 0;
        let mut mn = i64::MAX;
        let mut mx = i64::MIN;
        for &(v, c) in terms {
            if self.lo[v] < self.hi[v] {
                open += 1;
                mn = mn.min(c);
                mx = mx.max(c);
            }
        }
        if open == 0 {
            return (0, 0);
        }
        if open < self.group_free[g] {
            // The chosen member may lie outside this row
            mn = mn.min(0);
            mx = mx.max(0);
        }
        (mn, mx)
    }
}

fn segment_terms(terms: &[(usize, i64)], group_of: &[Option<usize>]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for (i, (v, _)) in terms.iter().enumerate() {
        let group = group_of[*v];
        match segments.last_mut() {
            Some(last) if last.group == group => last.end = i + 1,
            _ => segments.push(Segment {
                group,
                start: i,
                end: i + 1,
            }),
        }
    }
    segments
}

fn shift_bound(bound: i64, constant: i64) -> i64 {
    if bound == i64::MIN || bound == i64::MAX {
        bound
    } else {
        bound.saturating_sub(constant)
    }
}

fn term_bounds(coef: i64, lo: i64, hi: i64) -> (i64, i64) {
    let a = coef.saturating_mul(lo);
    let b = coef.saturating_mul(hi);
    (a.min(b), a.max(b))
}

/// Bounds on `var` implied by lo ≤ coef·var + rest ≤ hi.
fn implied_bounds(coef: i64, row_lo: i64, row_hi: i64, rest_min: i64, rest_max: i64) -> (i64, i64) {
    let mut lo = i64::MIN;
    let mut hi = i64::MAX;
    if row_hi != i64::MAX {
        let limit = row_hi.saturating_sub(rest_min);
        if coef > 0 {
            hi = div_floor(limit, coef);
        } else {
            lo = div_ceil(limit, coef);
        }
    }
    if row_lo != i64::MIN {
        let limit = row_lo.saturating_sub(rest_max);
        if coef > 0 {
            lo = lo.max(div_ceil(limit, coef));
        } else {
            hi = hi.min(div_floor(limit, coef));
        }
    }
    (lo, hi)
}

fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}
