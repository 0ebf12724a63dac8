//! Conversion between logical shares and per-target relations.

use std::collections::HashMap;

use time::OffsetDateTime;

use super::{Relation, Share};

/// One relation per target, each carrying the share's owner, key and deadline.
pub fn split(share: &Share) -> Vec<Relation> {
    share
        .targets
        .iter()
        .map(|target| Relation {
            owner: share.owner.clone(),
            key: share.key.clone(),
            target: target.clone(),
            until: share.until,
        })
        .collect()
}

/// Group relations into logical shares.
///
/// Relations belong to the same share only when owner, key and deadline are
/// all equal. Shares come out in the order their first relation was seen and
/// targets keep their relative order within a share.
pub fn merge<'a, I, R>(relations: I) -> Vec<Share>
where
    I: IntoIterator<Item = &'a R>,
    R: AsRef<Relation> + 'a,
{
    let mut shares: Vec<Share> = Vec::new();
    let mut index: HashMap<(&str, &str, Option<OffsetDateTime>), usize> = HashMap::new();

    for relation in relations {
        let relation = relation.as_ref();
        let group = (relation.owner.as_str(), relation.key.as_str(), relation.until);
        match index.get(&group) {
            Some(&i) => shares[i].targets.push(relation.target.clone()),
            None => {
                index.insert(group, shares.len());
                shares.push(Share {
                    owner: relation.owner.clone(),
                    key: relation.key.clone(),
                    until: relation.until,
                    targets: vec![relation.target.clone()],
                });
            }
        }
    }

    shares
}

/// Partition into `(live, expired)` at `now`.
///
/// Whoever calls this on a read path must delete every expired item from the
/// metadata store before answering.
pub fn reap_expired<T>(items: Vec<T>, now: OffsetDateTime) -> (Vec<T>, Vec<T>)
where
    T: AsRef<Relation>,
{
    items
        .into_iter()
        .partition(|item| !item.as_ref().is_expired(now))
}
