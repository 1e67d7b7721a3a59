/// Next nonce for an account: the chain's pending count, unless a locally
/// recorded transaction already used it.
pub fn next_nonce(chain_pending: u64, latest_local: Option<u64>) -> u64 {
    match latest_local {
        Some(local) => chain_pending.max(local.saturating_add(1)),
        None => chain_pending,
    }
}
