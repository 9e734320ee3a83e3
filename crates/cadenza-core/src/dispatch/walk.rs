//! Graph traversal shared by compiling and arming.
//!
//! "Down" walks from an output into the inputs feeding it and on through their
//! links; "up" walks from an input to the output it feeds and on through that
//! output's link. An aggregate whose outputs own recyclings is a context
//! boundary: walking down through it moves into a child recycling context,
//! walking up stops below it.

use super::TreeElement;
use crate::compat::Arc;
use crate::graph::{Channel, ChannelDirection, Recycling, RecyclingContext};

pub(crate) trait TreeVisitor {
    fn visit(&mut self, element: TreeElement, context: &Arc<RecyclingContext>);

    /// Context for the inputs below a recycling boundary. `None` ends the
    /// downward walk at the boundary.
    fn child_context(
        &mut self,
        context: &Arc<RecyclingContext>,
        first: &Arc<Recycling>,
        inputs: &[Arc<Channel>],
    ) -> Option<Arc<RecyclingContext>>;
}

/// Full walk for one channel: down first, then up.
pub(crate) fn walk_channel<V: TreeVisitor>(
    visitor: &mut V,
    channel: &Arc<Channel>,
    context: &Arc<RecyclingContext>,
) {
    match channel.direction() {
        ChannelDirection::Output if channel.pad() == 0 => {
            walk_down(visitor, channel, context);
            if let Some(link) = channel.link() {
                walk_up(visitor, &link, context);
            }
        }
        ChannelDirection::Output => walk_up(visitor, channel, context),
        ChannelDirection::Input => {
            if let Some(link) = channel.link() {
                walk_down(visitor, &link, context);
            }
            walk_up(visitor, channel, context);
        }
    }
}

/// Walk from an output down into the sub-tree feeding it.
pub(crate) fn walk_down<V: TreeVisitor>(
    visitor: &mut V,
    output: &Arc<Channel>,
    context: &Arc<RecyclingContext>,
) {
    if !output.is_output() {
        return;
    }
    let Some(audio) = output.audio() else {
        return;
    };

    visitor.visit(TreeElement::Output(Arc::clone(output)), context);
    visitor.visit(TreeElement::Audio(Arc::clone(&audio)), context);

    let inputs = audio.inputs_feeding(output);
    if inputs.is_empty() {
        return;
    }

    let child;
    let context = if audio.output_has_recycling() {
        let Some(first) = inputs.iter().find_map(|input| input.first_recycling()) else {
            return;
        };
        match visitor.child_context(context, &first, &inputs) {
            Some(ctx) => {
                child = ctx;
                &child
            }
            None => return,
        }
    } else {
        context
    };

    for input in &inputs {
        walk_down_input(visitor, input, context);
    }
}

/// Walk one input and on through its link.
pub(crate) fn walk_down_input<V: TreeVisitor>(
    visitor: &mut V,
    input: &Arc<Channel>,
    context: &Arc<RecyclingContext>,
) {
    if !input.is_input() {
        return;
    }

    visitor.visit(TreeElement::Input(Arc::clone(input)), context);
    if let Some(link) = input.link() {
        walk_down(visitor, &link, context);
    }
}

/// Walk from a channel up towards the end of its chain.
pub(crate) fn walk_up<V: TreeVisitor>(
    visitor: &mut V,
    channel: &Arc<Channel>,
    context: &Arc<RecyclingContext>,
) {
    let mut current = Arc::clone(channel);

    loop {
        let Some(audio) = current.audio() else {
            return;
        };

        match current.direction() {
            ChannelDirection::Output => {
                visitor.visit(TreeElement::Output(Arc::clone(&current)), context);
                visitor.visit(TreeElement::Audio(audio), context);

                match current.link() {
                    Some(link) => current = link,
                    None => return,
                }
            }
            ChannelDirection::Input => {
                visitor.visit(TreeElement::Input(Arc::clone(&current)), context);
                visitor.visit(TreeElement::Audio(Arc::clone(&audio)), context);

                if audio.output_has_recycling() {
                    return;
                }
                match audio.output_fed_by(&current) {
                    Some(output) => current = output,
                    None => return,
                }
            }
        }
    }
}
