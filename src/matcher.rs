use serde::Serialize;

use crate::models::{amounts_equal, exceeds_epsilon, Record, RecordMap};

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// Same invoice id on both sides. Green when the amounts agree, orange otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExactPair {
    pub id: String,
    pub depo: Record,
    pub eczane: Record,
}

impl ExactPair {
    /// Wholesaler net amount minus pharmacy net amount.
    pub fn difference(&self) -> f64 {
        self.depo.net_amount() - self.eczane.net_amount()
    }
}

/// Different invoice ids whose amounts agree (yellow).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountPair {
    pub depo_id: String,
    pub eczane_id: String,
    pub depo: Record,
    pub eczane: Record,
    /// Absolute day distance between the two dates (epoch for unparsed ones).
    pub date_gap_days: i64,
}

impl AmountPair {
    pub fn amount(&self) -> f64 {
        self.depo.net_amount()
    }
}

/// A record with no counterpart (red).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unmatched {
    pub id: String,
    pub record: Record,
}

impl Unmatched {
    fn of(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            record: record.clone(),
        }
    }
}

/// The five disjoint classifications. Every input record lands in exactly one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Buckets {
    pub green: Vec<ExactPair>,
    pub yellow: Vec<AmountPair>,
    pub orange: Vec<ExactPair>,
    pub red_depo: Vec<Unmatched>,
    pub red_eczane: Vec<Unmatched>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Classify every record of both sides.
///
/// Phase 1 pairs equal ids; phase 2 pairs the leftovers by amount, taking
/// the pharmacy record closest in date; phase 3 leaves the rest unmatched.
/// Leftovers are visited in source-file order, which makes the result
/// deterministic.
pub fn match_records(depo: &RecordMap, eczane: &RecordMap) -> Buckets {
    let mut buckets = Buckets::default();

    let (depo_rest, eczane_rest) = match_exact_id(depo, eczane, &mut buckets);
    match_by_amount(&depo_rest, &eczane_rest, &mut buckets);

    buckets
}

/// Phase 1. Returns the records of each side left without an id partner.
fn match_exact_id<'a>(
    depo: &'a RecordMap,
    eczane: &'a RecordMap,
    buckets: &mut Buckets,
) -> (Vec<&'a Record>, Vec<&'a Record>) {
    let mut depo_rest = Vec::new();
    for w in depo {
        let Some(p) = eczane.get(&w.id) else {
            depo_rest.push(w);
            continue;
        };
        let pair = ExactPair {
            id: w.id.clone(),
            depo: w.clone(),
            eczane: p.clone(),
        };
        if amounts_equal(w.net_amount(), p.net_amount()) {
            buckets.green.push(pair);
        } else {
            buckets.orange.push(pair);
        }
    }
    let eczane_rest = eczane.iter().filter(|p| !depo.contains(&p.id)).collect();
    (depo_rest, eczane_rest)
}

/// Phases 2 and 3.
fn match_by_amount(depo_rest: &[&Record], eczane_rest: &[&Record], buckets: &mut Buckets) {
    let mut taken = vec![false; eczane_rest.len()];

    for w in depo_rest {
        let nw = w.net_amount();
        if !exceeds_epsilon(nw) {
            buckets.red_depo.push(Unmatched::of(w));
            continue;
        }

        let mut best: Option<(usize, i64)> = None;
        for (i, p) in eczane_rest.iter().enumerate() {
            if taken[i] || !amounts_equal(nw, p.net_amount()) {
                continue;
            }
            let gap = (w.date_or_epoch() - p.date_or_epoch()).num_days().abs();
            // strict: the first-seen candidate keeps ties
            if best.map_or(true, |(_, best_gap)| gap < best_gap) {
                best = Some((i, gap));
            }
        }

        match best {
            Some((i, gap)) => {
                taken[i] = true;
                let p = eczane_rest[i];
                buckets.yellow.push(AmountPair {
                    depo_id: w.id.clone(),
                    eczane_id: p.id.clone(),
                    depo: (*w).clone(),
                    eczane: p.clone(),
                    date_gap_days: gap,
                });
            }
            None => buckets.red_depo.push(Unmatched::of(w)),
        }
    }

    buckets.red_eczane.extend(
        eczane_rest
            .iter()
            .zip(&taken)
            .filter(|(_, taken)| !**taken)
            .map(|(p, _)| Unmatched::of(p)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Side, EPSILON};
    use chrono::NaiveDate;

    fn rec(side: Side, id: &str, debit: f64, credit: f64, date: Option<&str>) -> Record {
        Record {
            id: id.to_string(),
            debit,
            credit,
            date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            kind: String::new(),
            side,
            line: 0,
        }
    }

    fn w(id: &str, debit: f64, date: Option<&str>) -> Record {
        rec(Side::Depo, id, debit, 0.0, date)
    }

    fn p(id: &str, debit: f64, date: Option<&str>) -> Record {
        rec(Side::Eczane, id, debit, 0.0, date)
    }

    fn map(records: Vec<Record>) -> RecordMap {
        records.into_iter().collect()
    }

    fn ids<T>(items: &[T], f: impl Fn(&T) -> &str) -> Vec<String> {
        items.iter().map(|x| f(x).to_string()).collect()
    }

    #[test]
    fn test_exact_match_green() {
        let b = match_records(
            &map(vec![w("A", 100.0, Some("2024-01-10"))]),
            &map(vec![p("A", 100.0, Some("2024-01-10"))]),
        );
        assert_eq!(ids(&b.green, |x| &x.id), vec!["A"]);
        assert!(b.yellow.is_empty() && b.orange.is_empty());
        assert!(b.red_depo.is_empty() && b.red_eczane.is_empty());
    }

    #[test]
    fn test_credit_side_match_green() {
        let b = match_records(
            &map(vec![rec(Side::Depo, "B", 0.0, 50.0, None)]),
            &map(vec![rec(Side::Eczane, "B", 0.0, 50.0, None)]),
        );
        assert_eq!(ids(&b.green, |x| &x.id), vec!["B"]);
    }

    #[test]
    fn test_amount_mismatch_orange() {
        let b = match_records(&map(vec![w("C", 120.0, None)]), &map(vec![p("C", 100.0, None)]));
        assert_eq!(b.orange.len(), 1);
        assert!((b.orange[0].difference() - 20.0).abs() < 1e-9);
        assert!(b.green.is_empty());
    }

    #[test]
    fn test_difference_of_exactly_epsilon_is_mismatch() {
        let b = match_records(&map(vec![w("C", 100.0, None)]), &map(vec![p("C", 100.0 - EPSILON, None)]));
        assert_eq!(b.orange.len(), 1);
        assert!(b.green.is_empty());

        let b = match_records(&map(vec![w("W", 100.0, None)]), &map(vec![p("P", 100.0 + EPSILON, None)]));
        assert!(b.yellow.is_empty());
        assert_eq!(b.red_depo.len(), 1);
        assert_eq!(b.red_eczane.len(), 1);
    }

    #[test]
    fn test_one_kurus_gap_is_mismatch_at_any_magnitude() {
        for (a, b) in [(10.0, 10.01), (1234.56, 1234.57), (100.0, 100.01)] {
            let exact = match_records(&map(vec![w("C", a, None)]), &map(vec![p("C", b, None)]));
            assert!(exact.green.is_empty(), "{a} vs {b} went green");
            assert_eq!(exact.orange.len(), 1);

            let by_amount = match_records(&map(vec![w("W", a, None)]), &map(vec![p("P", b, None)]));
            assert!(by_amount.yellow.is_empty(), "{a} vs {b} went yellow");
            assert_eq!(by_amount.red_depo.len(), 1);
            assert_eq!(by_amount.red_eczane.len(), 1);
        }
    }

    #[test]
    fn test_float_noise_still_matches() {
        let b = match_records(&map(vec![w("C", 0.1 + 0.2, None)]), &map(vec![p("C", 0.3, None)]));
        assert_eq!(b.green.len(), 1);
        let b = match_records(&map(vec![w("W", 1234.56, None)]), &map(vec![p("P", 1234.56, None)]));
        assert_eq!(b.yellow.len(), 1);
    }

    #[test]
    fn test_amount_match_prefers_closest_date() {
        let b = match_records(
            &map(vec![w("W1", 200.0, Some("2024-03-15"))]),
            &map(vec![
                p("P1", 200.0, Some("2024-03-20")),
                p("P2", 200.0, Some("2024-03-16")),
            ]),
        );
        assert_eq!(b.yellow.len(), 1);
        assert_eq!(b.yellow[0].depo_id, "W1");
        assert_eq!(b.yellow[0].eczane_id, "P2");
        assert_eq!(b.yellow[0].date_gap_days, 1);
        assert_eq!(ids(&b.red_eczane, |x| &x.id), vec!["P1"]);
    }

    #[test]
    fn test_date_tie_keeps_first_seen() {
        let b = match_records(
            &map(vec![w("W1", 200.0, Some("2024-03-15"))]),
            &map(vec![
                p("P1", 200.0, Some("2024-03-17")),
                p("P2", 200.0, Some("2024-03-13")),
            ]),
        );
        assert_eq!(b.yellow[0].eczane_id, "P1");
    }

    #[test]
    fn test_unparsed_date_loses_tiebreak() {
        let b = match_records(
            &map(vec![w("W1", 80.0, Some("2024-03-15"))]),
            &map(vec![p("P1", 80.0, None), p("P2", 80.0, Some("2024-05-01"))]),
        );
        assert_eq!(b.yellow[0].eczane_id, "P2");
    }

    #[test]
    fn test_exact_id_beats_closer_amount_match() {
        // W1 and P1 share an id but disagree on amount; P9 matches W1's amount
        // on the exact date, yet phase 1 already claimed W1.
        let b = match_records(
            &map(vec![w("W1", 100.0, Some("2024-03-15"))]),
            &map(vec![p("W1", 90.0, Some("2024-01-01")), p("P9", 100.0, Some("2024-03-15"))]),
        );
        assert_eq!(ids(&b.orange, |x| &x.id), vec!["W1"]);
        assert!(b.yellow.is_empty());
        assert_eq!(ids(&b.red_eczane, |x| &x.id), vec!["P9"]);
    }

    #[test]
    fn test_yellow_pairing_is_one_to_one() {
        let b = match_records(
            &map(vec![w("W1", 50.0, None), w("W2", 50.0, None)]),
            &map(vec![p("P1", 50.0, None)]),
        );
        assert_eq!(b.yellow.len(), 1);
        assert_eq!(b.yellow[0].depo_id, "W1");
        assert_eq!(ids(&b.red_depo, |x| &x.id), vec!["W2"]);
        assert!(b.red_eczane.is_empty());
    }

    #[test]
    fn test_residue_both_sides() {
        let b = match_records(&map(vec![w("X", 10.0, None)]), &map(vec![p("Y", 20.0, None)]));
        assert_eq!(ids(&b.red_depo, |x| &x.id), vec!["X"]);
        assert_eq!(ids(&b.red_eczane, |x| &x.id), vec!["Y"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(match_records(&RecordMap::new(), &RecordMap::new()), Buckets::default());
    }

    #[test]
    fn test_partition_counts() {
        let depo = map(vec![
            w("A", 10.0, None),
            w("B", 20.0, None),
            w("C", 30.0, None),
            w("D", 40.0, None),
            w("E", 0.005, None),
        ]);
        let eczane = map(vec![
            p("A", 10.0, None),
            p("B", 25.0, None),
            p("Q", 30.0, None),
            p("R", 99.0, None),
        ]);
        let b = match_records(&depo, &eczane);
        let shared = b.green.len() + b.orange.len() + b.yellow.len();
        assert_eq!(shared + b.red_depo.len(), depo.len());
        assert_eq!(shared + b.red_eczane.len(), eczane.len());
        assert_eq!(ids(&b.red_depo, |x| &x.id), vec!["D", "E"]);
        for pair in &b.yellow {
            assert_ne!(pair.depo_id, pair.eczane_id);
            assert!(pair.depo.net_amount() > EPSILON);
        }
    }
}
