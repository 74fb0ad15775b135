use glam::{Mat3, Mat4, Quat, Vec3};

use crate::utils::{Mesh, Vertex};

/// Local translation/rotation/scale of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl NodeTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: Option<String>,
    pub rest: NodeTransform,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
    pub color: [f32; 4],
}

impl Primitive {
    fn is_skinned(&self) -> bool {
        !self.joints.is_empty() && self.joints.len() == self.positions.len() && self.weights.len() == self.positions.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

/// Resolved node hierarchy of a loaded model
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub meshes: Vec<MeshData>,
    pub skins: Vec<Skin>,
}

/// Per-node local transforms for one frame; starts from the rest pose.
#[derive(Debug, Clone)]
pub struct Pose {
    pub locals: Vec<NodeTransform>,
}

impl SceneGraph {
    pub fn rest_pose(&self) -> Pose {
        Pose {
            locals: self.nodes.iter().map(|n| n.rest).collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh_instances()
            .flat_map(|(_, mesh)| self.meshes[mesh].primitives.iter())
            .map(|p| p.positions.len())
            .sum()
    }

    /// Nodes carrying a mesh, as (node, mesh) pairs, in node order
    fn mesh_instances(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.mesh.filter(|&m| m < self.meshes.len()).map(|m| (i, m)))
    }

    /// Resolve world matrices for every node reachable from the roots.
    pub fn world_matrices(&self, pose: &Pose) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().map(|&r| (r, Mat4::IDENTITY)).collect();
        while let Some((idx, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(idx) else { continue };
            let local = pose.locals.get(idx).copied().unwrap_or(node.rest);
            let m = parent * local.matrix();
            world[idx] = m;
            stack.extend(node.children.iter().map(|&c| (c, m)));
        }
        world
    }

    /// Build the posed model as one world-space mesh.
    ///
    /// Vertex and index layout is identical for every pose, so a renderer can
    /// upload indices once and rewrite only vertices per frame.
    pub fn posed_mesh(&self, pose: &Pose, model: Mat4) -> Mesh {
        let world = self.world_matrices(pose);
        let mut out = Mesh::empty();

        for (node_idx, mesh_idx) in self.mesh_instances() {
            let skin = self.nodes[node_idx].skin.and_then(|s| self.skins.get(s));
            let joint_mats: Vec<Mat4> = skin
                .map(|skin| {
                    skin.joints
                        .iter()
                        .enumerate()
                        .map(|(j, &node)| {
                            let ibm = skin.inverse_bind.get(j).copied().unwrap_or(Mat4::IDENTITY);
                            world.get(node).copied().unwrap_or(Mat4::IDENTITY) * ibm
                        })
                        .collect()
                })
                .unwrap_or_default();

            for prim in &self.meshes[mesh_idx].primitives {
                let base = out.vertices.len() as u32;
                let skinned = skin.is_some() && prim.is_skinned();

                for (v, pos) in prim.positions.iter().enumerate() {
                    let m = if skinned {
                        model * blend_joints(&joint_mats, prim.joints[v], prim.weights[v])
                    } else {
                        model * world[node_idx]
                    };
                    let normal = prim.normals.get(v).copied().unwrap_or([0.0, 1.0, 0.0]);
                    let n = (Mat3::from_mat4(m) * Vec3::from_array(normal)).normalize_or_zero();
                    out.vertices.push(Vertex {
                        pos: m.transform_point3(Vec3::from_array(*pos)).to_array(),
                        normal: n.to_array(),
                        color: prim.color,
                    });
                }

                if prim.indices.is_empty() {
                    out.indices.extend(base..base + prim.positions.len() as u32);
                } else {
                    out.indices.extend(prim.indices.iter().map(|i| base + i));
                }
            }
        }
        out
    }
}

fn blend_joints(joint_mats: &[Mat4], joints: [u16; 4], weights: [f32; 4]) -> Mat4 {
    let mut m = Mat4::ZERO;
    let mut total = 0.0;
    for (j, w) in joints.iter().zip(weights) {
        if w <= 0.0 {
            continue;
        }
        if let Some(jm) = joint_mats.get(*j as usize) {
            m += *jm * w;
            total += w;
        }
    }
    if total > 0.0 {
        m * (1.0 / total)
    } else {
        Mat4::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    /// root(skin, mesh) + joint child; one triangle fully weighted to the joint
    fn skinned_triangle() -> SceneGraph {
        SceneGraph {
            nodes: vec![
                Node { mesh: Some(0), skin: Some(0), children: vec![1], ..Default::default() },
                Node { name: Some("hips".into()), ..Default::default() },
            ],
            roots: vec![0],
            meshes: vec![MeshData {
                name: None,
                primitives: vec![Primitive {
                    positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                    normals: vec![[0.0, 0.0, 1.0]; 3],
                    indices: vec![0, 1, 2],
                    joints: vec![[0, 0, 0, 0]; 3],
                    weights: vec![[1.0, 0.0, 0.0, 0.0]; 3],
                    color: [1.0; 4],
                }],
            }],
            skins: vec![Skin { joints: vec![1], inverse_bind: vec![Mat4::IDENTITY] }],
        }
    }

    #[test]
    fn rest_pose_with_identity_joints_is_bind_pose() {
        let scene = skinned_triangle();
        let mesh = scene.posed_mesh(&scene.rest_pose(), Mat4::IDENTITY);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(close(mesh.vertices[1].pos, [1.0, 0.0, 0.0]));
        assert!(close(mesh.vertices[2].pos, [0.0, 1.0, 0.0]));
    }

    #[test]
    fn moving_a_joint_moves_weighted_vertices() {
        let scene = skinned_triangle();
        let mut pose = scene.rest_pose();
        pose.locals[1].translation = Vec3::new(0.0, 2.0, 0.0);
        let mesh = scene.posed_mesh(&pose, Mat4::IDENTITY);
        assert!(close(mesh.vertices[0].pos, [0.0, 2.0, 0.0]));
        assert!(close(mesh.vertices[1].pos, [1.0, 2.0, 0.0]));
    }

    #[test]
    fn model_matrix_places_the_whole_mesh() {
        let scene = skinned_triangle();
        let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));
        let mesh = scene.posed_mesh(&scene.rest_pose(), model);
        assert!(close(mesh.vertices[0].pos, [0.0, 0.0, -3.0]));
    }

    #[test]
    fn world_matrices_follow_hierarchy() {
        let mut scene = skinned_triangle();
        scene.nodes[0].rest.translation = Vec3::new(1.0, 0.0, 0.0);
        scene.nodes[1].rest.translation = Vec3::new(0.0, 1.0, 0.0);
        let world = scene.world_matrices(&scene.rest_pose());
        assert!(close(world[1].transform_point3(Vec3::ZERO).to_array(), [1.0, 1.0, 0.0]));
    }

    #[test]
    fn unindexed_primitives_get_sequential_indices() {
        let mut scene = skinned_triangle();
        scene.meshes[0].primitives[0].indices.clear();
        scene.nodes[0].skin = None;
        let mesh = scene.posed_mesh(&scene.rest_pose(), Mat4::IDENTITY);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(scene.vertex_count(), 3);
    }
}
