//! Pass-based resolution order for dependency graphs.
//!
//! Each pass walks the jobs in declaration order and resolves every job whose
//! prerequisites are already resolved, including those resolved earlier in
//! the same pass. An acyclic graph of `n` jobs is fully resolved within `n`
//! passes, so anything still unresolved after `n` passes lies on or behind a
//! cycle.

/// Jobs in the order their submissions must be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOrder {
    /// Job indices, each after all of its prerequisites.
    pub order: Vec<usize>,
    /// Number of passes needed to resolve every job.
    pub passes: usize,
}

/// Resolve `dependencies`, where entry `i` lists the prerequisite indices of
/// job `i`.
///
/// On failure, returns the indices left unresolved, in declaration order.
pub(super) fn resolve(dependencies: &[Vec<usize>]) -> Result<ResolutionOrder, Vec<usize>> {
    let total = dependencies.len();
    let mut resolved = vec![false; total];
    let mut order = Vec::with_capacity(total);
    let mut passes = 0;

    while order.len() < total && passes < total {
        passes += 1;
        for (idx, deps) in dependencies.iter().enumerate() {
            if resolved.get(idx).copied().unwrap_or(true) {
                continue;
            }
            if deps
                .iter()
                .all(|dep| resolved.get(*dep).copied().unwrap_or(false))
            {
                if let Some(flag) = resolved.get_mut(idx) {
                    *flag = true;
                }
                order.push(idx);
            }
        }
    }

    if order.len() == total {
        Ok(ResolutionOrder { order, passes })
    } else {
        Err(resolved
            .iter()
            .enumerate()
            .filter_map(|(idx, done)| (!done).then_some(idx))
            .collect())
    }
}
