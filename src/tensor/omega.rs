//! Other-agents action marginalizer
//!
//! `Omega[i, j_1..j_{N-1}, a, b_1..b_N, e_1..e_{N-1}]` is 1 exactly when
//! - `b_i == a` (the joint action contains the focal agent's action),
//! - `j_1 < .. < j_{N-1}` enumerate the agents other than `i`, and
//! - `e_l == b_{j_l}` (the duplicated other-agent actions agree with the joint action),
//!
//! and 0 otherwise. Multiplying by this mask inside a contraction sums over
//! every joint action of the other agents while pairing each of them with its
//! own policy, without spelling out the combinatorics per agent count.

use ndarray::{ArrayD, ArrayViewD, IxDyn};

/// Precomputed indicator tensor for `agents` agents with `actions` actions each.
#[derive(Debug, Clone)]
pub struct Omega {
    agents: usize,
    actions: usize,
    tensor: ArrayD<f64>,
}

impl Omega {
    pub fn new(agents: usize, actions: usize) -> Self {
        assert!(agents > 0, "Omega requires at least one agent");
        let others = agents - 1;

        let mut shape = Vec::with_capacity(3 * agents);
        shape.push(agents);
        shape.extend(std::iter::repeat_n(agents, others));
        shape.push(actions);
        shape.extend(std::iter::repeat_n(actions, agents));
        shape.extend(std::iter::repeat_n(actions, others));
        let mut tensor = ArrayD::zeros(IxDyn(&shape));

        let joint_count = actions.pow(agents as u32);
        let mut index = vec![0usize; shape.len()];
        for focal in 0..agents {
            let other_agents: Vec<usize> = (0..agents).filter(|&j| j != focal).collect();
            for flat in 0..joint_count {
                let joint = decode_joint_action(flat, agents, actions);
                index[0] = focal;
                index[1..agents].copy_from_slice(&other_agents);
                index[agents] = joint[focal];
                index[agents + 1..2 * agents + 1].copy_from_slice(&joint);
                for (slot, &other) in other_agents.iter().enumerate() {
                    index[2 * agents + 1 + slot] = joint[other];
                }
                tensor[IxDyn(&index)] = 1.0;
            }
        }

        Self {
            agents,
            actions,
            tensor,
        }
    }

    pub fn agents(&self) -> usize {
        self.agents
    }

    pub fn actions(&self) -> usize {
        self.actions
    }

    pub fn view(&self) -> ArrayViewD<'_, f64> {
        self.tensor.view()
    }
}

/// Mixed-radix decoding of a flat joint-action index (agent 0 most significant).
pub(crate) fn decode_joint_action(mut flat: usize, agents: usize, actions: usize) -> Vec<usize> {
    let mut joint = vec![0; agents];
    for slot in joint.iter_mut().rev() {
        *slot = flat % actions;
        flat /= actions;
    }
    joint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_agent_reduces_to_identity() {
        let omega = Omega::new(1, 3);
        assert_eq!(omega.view().shape(), &[1, 3, 3]);
        for a in 0..3 {
            for b in 0..3 {
                let expected = if a == b { 1.0 } else { 0.0 };
                assert_eq!(omega.view()[IxDyn(&[0, a, b])], expected);
            }
        }
    }

    #[test]
    fn two_agents_mark_consistent_joint_actions() {
        let omega = Omega::new(2, 2);
        // [i, j, a, b1, b2, e]
        assert_eq!(omega.view().shape(), &[2, 2, 2, 2, 2, 2]);
        assert_eq!(omega.view()[IxDyn(&[0, 1, 1, 1, 0, 0])], 1.0);
        assert_eq!(omega.view()[IxDyn(&[1, 0, 0, 1, 0, 1])], 1.0);
        // other-agent slot must not name the focal agent
        assert_eq!(omega.view()[IxDyn(&[0, 0, 1, 1, 0, 0])], 0.0);
        // duplicated other action must agree with the joint action
        assert_eq!(omega.view()[IxDyn(&[0, 1, 1, 1, 0, 1])], 0.0);
    }

    #[test]
    fn one_entry_per_focal_agent_and_joint_action() {
        let (agents, actions) = (3, 2);
        let omega = Omega::new(agents, actions);
        let ones = omega.view().iter().filter(|&&v| v == 1.0).count();
        assert_eq!(ones, agents * actions.pow(agents as u32));
    }

    #[test]
    fn joint_action_decoding_is_big_endian() {
        assert_eq!(decode_joint_action(5, 3, 2), vec![1, 0, 1]);
        assert_eq!(decode_joint_action(0, 2, 3), vec![0, 0]);
        assert_eq!(decode_joint_action(8, 2, 3), vec![2, 2]);
    }
}
