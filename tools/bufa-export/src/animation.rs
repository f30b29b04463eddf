//! Animation sampler
//!
//! Samples every joint's local transform at a fixed 30 fps across a clip's
//! frame range. Output is joint-major: all frames of joint 0, then joint 1.

use glam::Quat;

use crate::convert::CoordinateConversion;
use crate::error::ExportError;
use crate::scene::{AnimStack, Scene, SkinDeformer};
use crate::skeleton::Skeleton;

/// Sample rate (frames per second)
pub const FRAME_RATE: f32 = 30.0;

/// Absorbs float noise when converting clip times to frame numbers
const FRAME_EPSILON: f64 = 1e-4;

/// Pose of one joint in one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseSample {
    /// Quaternion rotation [x, y, z, w]
    pub rotation: [f32; 4],
    pub translation: [f32; 3],
    /// Uniform scale (1 for every joint but the first)
    pub scale: f32,
}

impl Default for PoseSample {
    fn default() -> Self {
        Self {
            rotation: [0.0, 0.0, 0.0, 1.0],
            translation: [0.0, 0.0, 0.0],
            scale: 1.0,
        }
    }
}

/// All samples of one joint
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrack {
    pub name: String,
    pub samples: Vec<PoseSample>,
}

/// Sampled animation clip
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub start_frame: i64,
    /// Last frame, inclusive
    pub end_frame: i64,
    /// One track per skeleton joint, in joint order
    pub tracks: Vec<JointTrack>,
}

impl AnimationClip {
    pub fn frame_count(&self) -> usize {
        (self.end_frame - self.start_frame + 1).max(0) as usize
    }
}

/// Summary of a clip for listing
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub name: String,
    pub start_frame: i64,
    pub end_frame: i64,
    pub animated_nodes: usize,
}

/// Inclusive frame range of a stack at [`FRAME_RATE`]
pub fn frame_range(stack: &AnimStack) -> (i64, i64) {
    let to_frame =
        |seconds: f32| (seconds as f64 * FRAME_RATE as f64 + FRAME_EPSILON).floor() as i64;
    (to_frame(stack.start), to_frame(stack.stop))
}

/// List the animation stacks of a scene
pub fn list_clips(scene: &Scene) -> Vec<ClipInfo> {
    scene
        .anim_stacks
        .iter()
        .map(|stack| {
            let (start_frame, end_frame) = frame_range(stack);
            ClipInfo {
                name: stack.name.clone(),
                start_frame,
                end_frame,
                animated_nodes: stack.curves.len(),
            }
        })
        .collect()
}

/// Sample one animation stack for every joint of `skeleton`
///
/// `skin` is the deformer the skeleton drives; a clip without clusters has
/// nothing to animate and is rejected.
pub fn sample_clip(
    scene: &Scene,
    skeleton: &Skeleton,
    skin: Option<&SkinDeformer>,
    stack: &AnimStack,
    conversion: &CoordinateConversion,
) -> Result<AnimationClip, ExportError> {
    if skin.is_none_or(|s| s.clusters.is_empty()) {
        return Err(ExportError::NoClusters {
            clip: stack.name.clone(),
        });
    }
    if skeleton.is_empty() {
        return Err(ExportError::EmptySkeleton);
    }

    let (start_frame, end_frame) = frame_range(stack);
    if end_frame < start_frame {
        return Err(ExportError::EmptyClip {
            clip: stack.name.clone(),
            start: start_frame,
            end: end_frame,
        });
    }

    let tracks = skeleton
        .joints()
        .iter()
        .enumerate()
        .map(|(index, joint)| {
            let order = scene.node(joint.node).rotation_order;
            let samples = (start_frame..=end_frame)
                .map(|frame| {
                    let time = frame as f32 / FRAME_RATE;
                    let local = scene.evaluate_local_transform(joint.node, Some(stack), time);
                    let rotation =
                        Quat::from_mat3(&order.euler_to_mat3(conversion.euler(local.rotation)))
                            .normalize();
                    PoseSample {
                        rotation: rotation.to_array(),
                        translation: conversion.translation(local.translation).to_array(),
                        scale: if index == 0 { local.scale.x } else { 1.0 },
                    }
                })
                .collect();
            JointTrack {
                name: joint.name.clone(),
                samples,
            }
        })
        .collect();

    let clip = AnimationClip {
        name: stack.name.clone(),
        start_frame,
        end_frame,
        tracks,
    };
    tracing::debug!(
        "Sampled clip '{}': {} joints, frames {}..={}",
        clip.name,
        clip.tracks.len(),
        start_frame,
        end_frame
    );
    Ok(clip)
}
