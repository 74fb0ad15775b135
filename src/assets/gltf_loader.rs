//! glTF / GLB decoding into a [`SceneGraph`] plus animation clips

use gltf::animation::util::ReadOutputs;
use glam::{Mat4, Quat, Vec3};

use crate::assets::LoadedModel;
use crate::error::AssetError;
use crate::model::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
use crate::model::scene_graph::{MeshData, Node, NodeTransform, Primitive, SceneGraph, Skin};

/// Decode a self-contained glTF (GLB, or JSON with embedded buffers).
pub fn parse_glb(bytes: &[u8]) -> Result<LoadedModel, AssetError> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;
    let buffer_data = |buffer: gltf::Buffer<'_>| Some(&*buffers[buffer.index()]);

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(AssetError::MissingScene)?;
    let roots: Vec<usize> = scene.nodes().map(|n| n.index()).collect();
    if roots.is_empty() {
        return Err(AssetError::MissingScene);
    }

    let nodes = document
        .nodes()
        .map(|node| {
            let (t, r, s) = node.transform().decomposed();
            Node {
                name: node.name().map(String::from),
                rest: NodeTransform {
                    translation: Vec3::from_array(t),
                    rotation: Quat::from_array(r),
                    scale: Vec3::from_array(s),
                },
                children: node.children().map(|c| c.index()).collect(),
                mesh: node.mesh().map(|m| m.index()),
                skin: node.skin().map(|s| s.index()),
            }
        })
        .collect();

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::debug!(mesh = mesh.index(), mode = ?primitive.mode(), "skipping non-triangle primitive");
                continue;
            }
            let reader = primitive.reader(buffer_data);
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            let normals = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            let indices = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_default();
            let joints = reader
                .read_joints(0)
                .map(|iter| iter.into_u16().collect())
                .unwrap_or_default();
            let weights = reader
                .read_weights(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_default();
            let color = primitive.material().pbr_metallic_roughness().base_color_factor();

            primitives.push(Primitive { positions, normals, indices, joints, weights, color });
        }
        meshes.push(MeshData {
            name: mesh.name().map(String::from),
            primitives,
        });
    }

    let skins = document
        .skins()
        .map(|skin| {
            let reader = skin.reader(buffer_data);
            Skin {
                joints: skin.joints().map(|j| j.index()).collect(),
                inverse_bind: reader
                    .read_inverse_bind_matrices()
                    .map(|iter| iter.map(|m| Mat4::from_cols_array_2d(&m)).collect())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let mut clips = Vec::new();
    for animation in document.animations() {
        let name = animation
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("animation_{}", animation.index()));

        let mut channels = Vec::new();
        for channel in animation.channels() {
            let reader = channel.reader(buffer_data);
            let Some(inputs) = reader.read_inputs() else { continue };
            let times: Vec<f32> = inputs.collect();

            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Step => Interpolation::Step,
                gltf::animation::Interpolation::Linear => Interpolation::Linear,
                gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
            };
            let spline = interpolation == Interpolation::CubicSpline;

            let values = match reader.read_outputs() {
                Some(ReadOutputs::Translations(iter)) => {
                    ChannelValues::Translation(spline_values(iter.map(Vec3::from_array).collect(), spline))
                }
                Some(ReadOutputs::Rotations(iter)) => {
                    ChannelValues::Rotation(spline_values(iter.into_f32().map(Quat::from_array).collect(), spline))
                }
                Some(ReadOutputs::Scales(iter)) => {
                    ChannelValues::Scale(spline_values(iter.map(Vec3::from_array).collect(), spline))
                }
                // morph target weights are not animated
                _ => continue,
            };

            channels.push(Channel {
                node: channel.target().node().index(),
                times,
                values,
                interpolation,
            });
        }
        clips.push(AnimationClip::new(name, channels));
    }

    let scene = SceneGraph { nodes, roots, meshes, skins };
    tracing::info!(
        nodes = scene.nodes.len(),
        meshes = scene.meshes.len(),
        skins = scene.skins.len(),
        vertices = scene.vertex_count(),
        clips = ?clips.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        "model decoded"
    );

    Ok(LoadedModel { scene, clips })
}

/// Cubic spline outputs come as (in-tangent, value, out-tangent) triples; keep the values.
fn spline_values<T: Copy>(values: Vec<T>, spline: bool) -> Vec<T> {
    if !spline {
        return values;
    }
    values.chunks_exact(3).map(|triple| triple[1]).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A GLB holding one triangle node and a "Walk" clip sliding it along +x.
    pub(crate) fn walking_triangle_glb(with_animation: bool) -> Vec<u8> {
        let mut bin: Vec<u8> = Vec::new();
        for f in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend(f.to_le_bytes());
        }
        for f in [0.0f32, 1.0] {
            bin.extend(f.to_le_bytes());
        }
        for f in [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0] {
            bin.extend(f.to_le_bytes());
        }

        let animations = if with_animation {
            r#","animations":[{"name":"Walk","channels":[{"sampler":0,"target":{"node":0,"path":"translation"}}],"samplers":[{"input":1,"output":2,"interpolation":"LINEAR"}]}]"#
        } else {
            ""
        };
        let json = format!(
            concat!(
                r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],"#,
                r#""nodes":[{{"name":"body","mesh":0}}],"#,
                r#""meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],"#,
                r#""buffers":[{{"byteLength":{len}}}],"#,
                r#""bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}},{{"buffer":0,"byteOffset":36,"byteLength":8}},{{"buffer":0,"byteOffset":44,"byteLength":24}}],"#,
                r#""accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}},"#,
                r#"{{"bufferView":1,"componentType":5126,"count":2,"type":"SCALAR","min":[0],"max":[1]}},"#,
                r#"{{"bufferView":2,"componentType":5126,"count":2,"type":"VEC3"}}]{anims}}}"#
            ),
            len = bin.len(),
            anims = animations,
        );
        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend(b"glTF");
        glb.extend(2u32.to_le_bytes());
        glb.extend((total as u32).to_le_bytes());
        glb.extend((json.len() as u32).to_le_bytes());
        glb.extend(0x4E4F_534Au32.to_le_bytes());
        glb.extend(&json);
        glb.extend((bin.len() as u32).to_le_bytes());
        glb.extend(0x004E_4942u32.to_le_bytes());
        glb.extend(&bin);
        glb
    }

    #[test]
    fn decodes_nodes_meshes_and_clips() {
        let model = parse_glb(&walking_triangle_glb(true)).unwrap();
        assert_eq!(model.scene.roots, vec![0]);
        assert_eq!(model.scene.nodes[0].name.as_deref(), Some("body"));
        assert_eq!(model.scene.meshes[0].primitives[0].positions.len(), 3);
        assert_eq!(model.scene.vertex_count(), 3);

        assert_eq!(model.clips.len(), 1);
        let clip = &model.clips[0];
        assert_eq!(clip.name, "Walk");
        assert_eq!(clip.duration, 1.0);
        assert!(matches!(&clip.channels[0].values, ChannelValues::Translation(v) if v[1].x == 2.0));
    }

    #[test]
    fn model_without_animations_has_no_clips() {
        let model = parse_glb(&walking_triangle_glb(false)).unwrap();
        assert!(model.clips.is_empty());
    }

    #[test]
    fn garbage_is_a_gltf_error() {
        assert!(matches!(parse_glb(b"definitely not a model"), Err(AssetError::Gltf(_))));
    }

    #[test]
    fn spline_outputs_keep_middle_values() {
        assert_eq!(spline_values(vec![9, 1, 9, 8, 2, 8], true), vec![1, 2]);
        assert_eq!(spline_values(vec![1, 2], false), vec![1, 2]);
    }
}
