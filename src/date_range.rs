use chrono::{DateTime, Utc};

use crate::observable::Observable;

/// Owns the two bounds of the upload-date range and keeps them mutually
/// consistent: whichever bound a write would push past the other drags the
/// other bound along with it.
///
/// The correction cannot recurse: the echo write lands on a value that is
/// already equal, and observable change-suppression swallows it. All mutation
/// happens on the coordination context, so no locking is involved.
#[derive(Clone)]
pub struct DateRangeCoordinator {
    pub min_date: Observable<DateTime<Utc>>,
    pub max_date: Observable<DateTime<Utc>>,
}

impl DateRangeCoordinator {
    pub fn new(initial: DateTime<Utc>) -> Self {
        let min_date = Observable::new(initial);
        let max_date = Observable::new(initial);

        let min = min_date.clone();
        max_date.subscribe(move |max| {
            if *max < min.get() {
                min.set(*max);
            }
        });

        let max = max_date.clone();
        min_date.subscribe(move |min| {
            if *min > max.get() {
                max.set(*min);
            }
        });

        Self { min_date, max_date }
    }
}
