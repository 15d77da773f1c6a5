use rand::seq::SliceRandom;
use rand::Rng;

/// Uniformly picks `target` distinct entries when there are more than that; otherwise keeps all.
pub fn sample_results<T, R>(items: Vec<T>, target: usize, rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if items.len() <= target {
        return items;
    }
    items.choose_multiple(rng, target).cloned().collect()
}
