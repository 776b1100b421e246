use std::collections::HashSet;
use tracing::warn;

use super::TaskSpec;

/// Order a batch so that every task appears after all of its declared
/// dependencies. The output always contains every input task exactly once:
/// when no remaining task can be placed (a cycle, a self-dependency, or a
/// reference to an id missing from the batch), the rest are appended in
/// submission order and the degradation is logged instead of raised.
///
/// Priority is the secondary key: each placement round picks the
/// highest-priority task among those whose dependencies are satisfied,
/// with ties resolved by submission order. A batch with no dependencies at
/// all therefore comes out stably sorted by descending priority.
pub fn resolve(tasks: &[TaskSpec]) -> Vec<TaskSpec> {
    let mut ordered: Vec<TaskSpec> = Vec::with_capacity(tasks.len());
    let mut satisfied: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<&TaskSpec> = tasks.iter().collect();

    while !remaining.is_empty() {
        let mut best: Option<(usize, i32)> = None;
        for (i, task) in remaining.iter().enumerate() {
            let ready = task
                .depends_on
                .iter()
                .all(|dep| satisfied.contains(dep.as_str()));
            if !ready {
                continue;
            }
            // Strict > keeps the earliest task on priority ties.
            match best {
                Some((_, p)) if p >= task.priority => {}
                _ => best = Some((i, task.priority)),
            }
        }

        match best {
            Some((idx, _)) => {
                let task = remaining.remove(idx);
                satisfied.insert(task.task_id.as_str());
                ordered.push(task.clone());
            }
            None => {
                warn!(
                    unplaced = remaining.len(),
                    "unsatisfiable dependencies (cycle or missing id), scheduling remaining tasks in submission order"
                );
                ordered.extend(remaining.drain(..).cloned());
            }
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn task(id: &str, depends_on: &[&str], priority: i32) -> TaskSpec {
        TaskSpec {
            task_id: id.to_string(),
            task_type: "analyzer".to_string(),
            input_data: Map::new(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            priority,
        }
    }

    fn ids(order: &[TaskSpec]) -> Vec<&str> {
        order.iter().map(|t| t.task_id.as_str()).collect()
    }

    #[test]
    fn test_dependency_chain_order() {
        let tasks = vec![
            task("c", &["b"], 0),
            task("a", &[], 0),
            task("b", &["a"], 0),
        ];
        assert_eq!(ids(&resolve(&tasks)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_priority_orders_independent_tasks() {
        let tasks = vec![task("low", &[], 1), task("high", &[], 5), task("mid", &[], 3)];
        assert_eq!(ids(&resolve(&tasks)), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_equal_priority_is_stable() {
        let tasks = vec![task("first", &[], 2), task("second", &[], 2), task("third", &[], 2)];
        assert_eq!(ids(&resolve(&tasks)), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_priority_never_overrides_dependencies() {
        // The dependent has the higher priority but must still run second.
        let tasks = vec![task("dep", &["base"], 10), task("base", &[], 0)];
        assert_eq!(ids(&resolve(&tasks)), vec!["base", "dep"]);
    }

    #[test]
    fn test_cycle_degrades_to_submission_order() {
        let tasks = vec![task("t1", &["t2"], 0), task("t2", &["t1"], 0), task("t3", &[], 0)];
        let order = resolve(&tasks);
        // t3 is placeable; the cycle pair is appended in submission order.
        assert_eq!(ids(&order), vec!["t3", "t1", "t2"]);
    }

    #[test]
    fn test_self_dependency_degrades() {
        let tasks = vec![task("loner", &["loner"], 0)];
        assert_eq!(ids(&resolve(&tasks)), vec!["loner"]);
    }

    #[test]
    fn test_dangling_reference_degrades() {
        let tasks = vec![task("a", &[], 0), task("b", &["ghost"], 0)];
        assert_eq!(ids(&resolve(&tasks)), vec!["a", "b"]);
    }

    #[test]
    fn test_every_task_appears_exactly_once() {
        let tasks = vec![
            task("a", &[], 1),
            task("b", &["a"], 9),
            task("c", &["missing"], 5),
            task("d", &["d"], 2),
            task("e", &[], 0),
        ];
        let order = resolve(&tasks);
        assert_eq!(order.len(), tasks.len());
        let mut seen: Vec<&str> = ids(&order);
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve(&[]).is_empty());
    }

    #[test]
    fn test_diamond_dependencies() {
        let tasks = vec![
            task("sink", &["left", "right"], 0),
            task("left", &["root"], 1),
            task("right", &["root"], 2),
            task("root", &[], 0),
        ];
        let resolved = resolve(&tasks);
        let order = ids(&resolved);
        assert_eq!(order[0], "root");
        assert_eq!(order[3], "sink");
        // Higher priority branch is placed first once both are ready.
        assert_eq!(order[1], "right");
    }
}
