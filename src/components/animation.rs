//! Skeletal Animation
//!
//! An animation collection pairs one skeleton with any number of named
//! keyframe animations. The variably-sized skeleton and clip data live in
//! [`AnimationSet`], owned by the component store's side table; the record
//! in the arena only keeps playback state and the index of its set.
//!
//! Bone rotations in keyframes are relative to the bind pose: the posed
//! rotation of bone `i` is `bind_rotation * keyframe_rotation[i]`, and the
//! root bone is additionally displaced by the keyframe's root offset.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

use super::{ComponentKind, ComponentRecord, RecordHeader};
use crate::errors::{Result, ThirtyError};
use crate::render::{ShaderFacility, ShaderId, Uniform};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub position: Vec3,
    pub rotation: Quat,
    /// 1-based index of the parent bone, 0 for a root
    pub parent: u32,
}

/// Bones plus the derived evaluation order and bind pose.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub model: Mat4,
    bones: Vec<Bone>,
    /// Bone indices with every parent before its children
    order: Vec<usize>,
    absolute: Vec<Mat4>,
    bind_inverse: Vec<Mat4>,
}

impl Skeleton {
    /// Builds a skeleton and computes its bind pose.
    ///
    /// Fails if a parent index is out of range or the parents form a cycle.
    pub fn new(model: Mat4, bones: Vec<Bone>) -> Result<Self> {
        let order = Self::bone_order(&bones)?;
        let mut skeleton = Self {
            model,
            absolute: vec![Mat4::IDENTITY; bones.len()],
            bind_inverse: Vec::new(),
            bones,
            order,
        };
        skeleton.absolute = skeleton.absolute_transforms(&skeleton.bones);
        skeleton.bind_inverse = skeleton.absolute.iter().map(Mat4::inverse).collect();
        Ok(skeleton)
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Bind-pose absolute transform of every bone.
    #[must_use]
    pub fn bind_pose(&self) -> &[Mat4] {
        &self.absolute
    }

    fn bone_order(bones: &[Bone]) -> Result<Vec<usize>> {
        let n = bones.len();
        if let Some((i, bone)) = bones
            .iter()
            .enumerate()
            .find(|(_, b)| b.parent as usize > n)
        {
            return Err(ThirtyError::BadSkeleton(format!(
                "bone {i} has parent {} but there are only {n} bones",
                bone.parent
            )));
        }

        let mut placed = vec![false; n];
        let mut order = Vec::with_capacity(n);
        while order.len() < n {
            let before = order.len();
            for (i, bone) in bones.iter().enumerate() {
                if placed[i] {
                    continue;
                }
                if bone.parent == 0 || placed[bone.parent as usize - 1] {
                    placed[i] = true;
                    order.push(i);
                }
            }
            if order.len() == before {
                return Err(ThirtyError::BadSkeleton("bone parents form a cycle".into()));
            }
        }
        Ok(order)
    }

    fn absolute_transforms(&self, bones: &[Bone]) -> Vec<Mat4> {
        let mut absolute = vec![Mat4::IDENTITY; bones.len()];
        for &i in &self.order {
            let bone = &bones[i];
            let parent = match bone.parent {
                0 => self.model,
                p => absolute[p as usize - 1],
            };
            // 绕自身原点旋转，再平移回父节点位置
            let translation = parent.w_axis;
            let mut m = parent;
            m.w_axis = glam::Vec4::W;
            m *= Mat4::from_quat(bone.rotation);
            m.w_axis = translation;
            absolute[i] = m * Mat4::from_translation(bone.position);
        }
        absolute
    }

    /// Absolute transforms of the skeleton posed by `keyframe`.
    #[must_use]
    pub fn posed(&self, keyframe: &Keyframe) -> Vec<Mat4> {
        debug_assert_eq!(keyframe.rotations.len(), self.bones.len());
        let mut bones = self.bones.clone();
        for (bone, rotation) in bones.iter_mut().zip(&keyframe.rotations) {
            bone.rotation *= *rotation;
        }
        if let Some(&root) = self.order.first() {
            bones[root].position += keyframe.root_offset;
        }
        self.absolute_transforms(&bones)
    }

    /// Uploads `bones[i]` skinning matrices for the given absolute pose.
    pub fn bind_bones<S: ShaderFacility + ?Sized>(
        &self,
        absolute: &[Mat4],
        shader: ShaderId,
        shaders: &mut S,
    ) {
        for (i, (abs, inv)) in absolute.iter().zip(&self.bind_inverse).enumerate() {
            shaders.set_uniform(shader, &format!("bones[{i}]"), Uniform::Mat4(*abs * *inv));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub timestamp: f32,
    pub root_offset: Vec3,
    /// One rotation per bone, relative to the bind pose
    pub rotations: Vec<Quat>,
}

impl Keyframe {
    /// Interpolates between `prev` and `next` at `timestamp`.
    #[must_use]
    pub fn interpolate(prev: &Keyframe, next: &Keyframe, timestamp: f32) -> Keyframe {
        let span = next.timestamp - prev.timestamp;
        let t = if span > 0.0 {
            ((timestamp - prev.timestamp) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Keyframe {
            timestamp,
            root_offset: prev.root_offset.lerp(next.root_offset, t),
            rotations: prev
                .rotations
                .iter()
                .zip(&next.rotations)
                .map(|(a, b)| a.slerp(*b, t))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub keyframes: Vec<Keyframe>,
}

impl Animation {
    /// Timestamp of the last keyframe.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.timestamp)
    }

    /// Pose at `timestamp`, or `None` when the timestamp is outside the
    /// keyframe range.
    #[must_use]
    pub fn sample(&self, timestamp: f32) -> Option<Keyframe> {
        let next = self.keyframes.iter().position(|k| k.timestamp > timestamp)?;
        if next == 0 {
            return None;
        }
        Some(Keyframe::interpolate(
            &self.keyframes[next - 1],
            &self.keyframes[next],
            timestamp,
        ))
    }
}

/// Skeleton and clips of one animation collection.
#[derive(Debug, Clone)]
pub struct AnimationSet {
    pub skeleton: Skeleton,
    pub animations: Vec<Animation>,
}

impl AnimationSet {
    #[must_use]
    pub fn new(skeleton: Skeleton, animations: Vec<Animation>) -> Self {
        Self { skeleton, animations }
    }

    /// 0-based index of the animation called `name`.
    #[must_use]
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|a| a.name == name)
    }
}

/// Playback state of an animation collection.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct AnimationRecord {
    pub header: RecordHeader,
    /// Index of the [`AnimationSet`] in the store's side table
    pub set: u32,
    pub running: u32,
    /// 1-based current animation, 0 for the bind pose
    pub current: u32,
    pub time: f32,
}

impl ComponentRecord for AnimationRecord {
    const KINDS: &'static [ComponentKind] = &[ComponentKind::AnimationCollection];

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }
}

impl AnimationRecord {
    #[must_use]
    pub fn new(set: u32) -> Self {
        Self {
            header: RecordHeader::zeroed(),
            set,
            running: 0,
            current: 0,
            time: 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running != 0
    }

    /// 0-based index of the selected animation, `None` in bind pose.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<usize> {
        self.current.checked_sub(1).map(|c| c as usize)
    }

    /// Starts animation `anim` from the beginning.
    pub fn play(&mut self, anim: usize) {
        self.running = 1;
        self.current = anim as u32 + 1;
        self.time = 0.0;
    }

    /// Freezes animation `anim` at `timestamp`.
    pub fn pose(&mut self, anim: usize, timestamp: f32) {
        self.running = 0;
        self.current = anim as u32 + 1;
        self.time = timestamp;
    }

    pub fn set_bind_pose(&mut self) {
        self.running = 0;
        self.current = 0;
    }

    /// Advances time, wrapping at the last keyframe.
    pub fn update(&mut self, set: &AnimationSet, dt: f32) {
        if !self.is_running() {
            return;
        }
        let Some(anim) = self.current().and_then(|c| set.animations.get(c)) else {
            return;
        };
        let total = anim.duration();
        self.time = if total > 0.0 {
            (self.time + dt).rem_euclid(total)
        } else {
            0.0
        };
    }

    /// Uploads skinning matrices for the current pose.
    ///
    /// Falls back to the bind pose in bind-pose mode and whenever the time
    /// lies outside the animation's keyframes.
    pub fn bind_bones<S: ShaderFacility + ?Sized>(
        &self,
        set: &AnimationSet,
        shader: ShaderId,
        shaders: &mut S,
    ) {
        let skeleton = &set.skeleton;
        let posed = self
            .current()
            .and_then(|c| set.animations.get(c))
            .and_then(|anim| anim.sample(self.time))
            .map(|keyframe| skeleton.posed(&keyframe));

        match posed {
            Some(absolute) => skeleton.bind_bones(&absolute, shader, shaders),
            None => skeleton.bind_bones(skeleton.bind_pose(), shader, shaders),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bone_set() -> AnimationSet {
        let bones = vec![
            Bone { position: Vec3::new(0.0, 1.0, 0.0), rotation: Quat::IDENTITY, parent: 2 },
            Bone { position: Vec3::ZERO, rotation: Quat::IDENTITY, parent: 0 },
        ];
        let skeleton = Skeleton::new(Mat4::IDENTITY, bones).unwrap();
        let key = |t: f32, y: f32| Keyframe {
            timestamp: t,
            root_offset: Vec3::new(0.0, y, 0.0),
            rotations: vec![Quat::IDENTITY; 2],
        };
        AnimationSet::new(
            skeleton,
            vec![Animation { name: "walk".into(), keyframes: vec![key(0.0, 0.0), key(2.0, 2.0)] }],
        )
    }

    #[test]
    fn test_parents_evaluated_first() {
        let set = two_bone_set();
        let abs = set.skeleton.bind_pose();
        assert_eq!(abs[1].w_axis.truncate(), Vec3::ZERO);
        assert_eq!(abs[0].w_axis.truncate(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let bones = vec![
            Bone { position: Vec3::ZERO, rotation: Quat::IDENTITY, parent: 2 },
            Bone { position: Vec3::ZERO, rotation: Quat::IDENTITY, parent: 1 },
        ];
        assert!(matches!(
            Skeleton::new(Mat4::IDENTITY, bones),
            Err(ThirtyError::BadSkeleton(_))
        ));
    }

    #[test]
    fn test_update_wraps_at_last_keyframe() {
        let set = two_bone_set();
        let mut rec = AnimationRecord::new(0);
        rec.play(set.index_by_name("walk").unwrap());
        rec.update(&set, 1.5);
        assert!((rec.time - 1.5).abs() < 1e-6);
        rec.update(&set, 1.0);
        assert!((rec.time - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_update_wraps_long_steps() {
        let set = two_bone_set();
        let mut rec = AnimationRecord::new(0);
        rec.play(0);
        // several clip lengths in one frame still land inside the clip
        rec.update(&set, 7.0);
        assert!((rec.time - 1.0).abs() < 1e-6);
        assert!(set.animations[0].sample(rec.time).is_some());
    }

    #[test]
    fn test_update_zero_length_clip_stays_at_start() {
        let mut set = two_bone_set();
        set.animations[0].keyframes.truncate(1);
        let mut rec = AnimationRecord::new(0);
        rec.play(0);
        rec.update(&set, 3.5);
        assert_eq!(rec.time, 0.0);
    }

    #[test]
    fn test_sample_interpolates_root_offset() {
        let set = two_bone_set();
        let k = set.animations[0].sample(1.0).unwrap();
        assert!((k.root_offset.y - 1.0).abs() < 1e-6);
        assert!(set.animations[0].sample(5.0).is_none());
    }
}
