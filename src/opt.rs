//! Compile-time constant folding.
//!
//! A single post-order pass over the tree: any call whose callable is pure and
//! whose arguments have all been reduced to constants is evaluated once and
//! replaced by its result. Impure calls act as folding barriers, so a call to
//! `random` (or any binding marked impure) keeps re-evaluating at runtime, as
//! do all of its ancestors.

use crate::expr::Expr;

/// Folds constant subtrees of `expr` in place.
pub(crate) fn fold_constants(expr: &mut Expr) {
    let Expr::Call(call) = expr else {
        return;
    };
    for arg in &mut call.args {
        fold_constants(arg);
    }
    if call.pure && call.args.iter().all(|arg| matches!(arg, Expr::Const(_))) {
        *expr = Expr::Const(expr.eval(&[]));
    }
}
