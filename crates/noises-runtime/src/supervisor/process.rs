//! Process liveness and subtree termination.

use std::collections::{HashMap, HashSet};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal;
#[cfg(unix)]
use nix::unistd::Pid as NixPid;

/// Whether a process with this PID currently exists.
///
/// On Unix a null signal is sent: `ESRCH` means gone, anything else
/// (including `EPERM`) means the PID is in use. PID 0 never names a
/// single process and is reported dead.
pub fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }

    #[cfg(unix)]
    {
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        !matches!(signal::kill(NixPid::from_raw(raw), None), Err(Errno::ESRCH))
    }

    #[cfg(not(unix))]
    {
        let target = Pid::from_u32(pid);
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            ProcessRefreshKind::nothing(),
        );
        sys.process(target).is_some()
    }
}

/// All descendants of `root`, ordered so that every child comes before its
/// parent.
pub fn descendants(root: u32) -> Vec<u32> {
    let mut sys = System::new();
    sys.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());

    let edges: Vec<(u32, u32)> = sys
        .processes()
        .iter()
        .filter_map(|(pid, process)| process.parent().map(|parent| (parent.as_u32(), pid.as_u32())))
        .collect();

    descendants_from_edges(root, &edges)
}

/// Children-first ordering of the subtree below `root`, given
/// `(parent, child)` pairs.
pub fn descendants_from_edges(root: u32, edges: &[(u32, u32)]) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(parent, child) in edges {
        if parent != child {
            children.entry(parent).or_default().push(child);
        }
    }
    for list in children.values_mut() {
        list.sort_unstable();
    }

    let mut ordered = Vec::new();
    let mut visited = HashSet::from([root]);
    // (pid, children expanded)
    let mut stack = vec![(root, false)];
    while let Some((pid, expanded)) = stack.pop() {
        if expanded {
            if pid != root {
                ordered.push(pid);
            }
            continue;
        }
        stack.push((pid, true));
        for &child in children.get(&pid).into_iter().flatten().rev() {
            if visited.insert(child) {
                stack.push((child, false));
            }
        }
    }
    ordered
}

/// Forcefully kill every descendant of `root`, children first.
///
/// Returns how many kill signals were delivered.
pub fn kill_descendants(root: u32) -> usize {
    let targets = descendants(root);
    if targets.is_empty() {
        return 0;
    }

    let mut sys = System::new();
    sys.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());

    let mut killed = 0;
    for pid in targets {
        match sys.process(Pid::from_u32(pid)) {
            Some(process) if process.kill() => {
                debug!(pid, "killed child process");
                killed += 1;
            }
            Some(_) => debug!(pid, "failed to kill child process"),
            None => {}
        }
    }
    killed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_process_is_alive() {
        assert!(pid_alive(std::process::id()));
    }

    #[test]
    fn pid_zero_is_not_alive() {
        // kill(0, _) addresses the caller's process group.
        assert!(!pid_alive(0));
    }

    #[cfg(unix)]
    #[test]
    fn exited_child_is_not_alive() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(!pid_alive(pid));
    }

    #[test]
    fn subtree_is_children_first() {
        // 1 -> 2 -> 4
        //   -> 3
        // 9 -> 10 (unrelated)
        let edges = [(1, 2), (1, 3), (2, 4), (9, 10)];
        let order = descendants_from_edges(1, &edges);

        assert_eq!(order.len(), 3);
        let pos = |pid| order.iter().position(|p| *p == pid).unwrap();
        assert!(pos(4) < pos(2));
        assert!(!order.contains(&1));
        assert!(!order.contains(&10));
    }

    #[test]
    fn cycles_terminate() {
        let edges = [(1, 2), (2, 3), (3, 2)];
        assert_eq!(descendants_from_edges(1, &edges), vec![3, 2]);
    }

    #[test]
    fn leaf_has_no_descendants() {
        assert!(descendants_from_edges(7, &[(1, 2)]).is_empty());
    }
}
