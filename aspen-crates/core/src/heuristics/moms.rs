use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::WatchLists;

/// The MOMS ("maximum occurrences in clauses of minimum size") score of `var`: high for
/// variables occurring often in short clauses in both polarities. Ternary clauses are counted
/// only if the variable occurs in no binary clause.
pub(crate) fn moms_score(watch_lists: &WatchLists, var: Var) -> u64 {
    let positive = Literal::positive(var);
    let negative = Literal::negative(var);
    let mut p = watch_lists.num_binary(negative) as u64;
    let mut n = watch_lists.num_binary(positive) as u64;
    if p == 0 && n == 0 {
        p = watch_lists.num_ternary(negative) as u64;
        n = watch_lists.num_ternary(positive) as u64;
    }
    ((p * n) << 10) + p + n
}
