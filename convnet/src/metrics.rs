use ndarray::{Array1, ArrayView2, Axis};

/// Returns the index of the highest score of every row.
///
/// # Arguments
/// * `scores` - A `(batch, num_classes)` matrix.
pub fn get_class(scores: ArrayView2<f32>) -> Array1<usize> {
    scores.map_axis(Axis(1), |row| {
        row.iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |(best, max), (i, &score)| {
                if score > max { (i, score) } else { (best, max) }
            })
            .0
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn picks_highest_score() {
        let scores = array![[0.1, 0.7, 0.2], [0.5, 0.25, 0.25], [0.0, 0.0, 1.0]];
        assert_eq!(get_class(scores.view()), array![1, 0, 2]);
    }

    #[test]
    fn ties_pick_first() {
        let scores = array![[0.5, 0.5]];
        assert_eq!(get_class(scores.view()), array![0]);
    }
}
