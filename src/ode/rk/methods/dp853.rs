//! The 12-stage Dormand-Prince 8(5,3) pair (C6). Tableau constants from
//! Hairer, Norsett & Wanner's `dop853.f`/Table 5.2 reference embedding
//! (the canonical publication of this method). Dense output uses the
//! method's own degree-7 polynomial, built from three further
//! interpolation-only stage evaluations (`extra_stages`) beyond the 12
//! propagation stages, exactly as `dop853.f`'s `CONTD8` routine does.

use crate::field::FieldElement;
use crate::linalg::DVec;
use crate::ode::interpolator::DenseOutput;
use crate::ode::rk::engine::ErkMethod;
use crate::ode::rk::tableau::ButcherTableau;

const C: [f64; 12] = [
    0.0,
    0.526001519587677318785587544488e-01,
    0.789002279381515978178381316732e-01,
    0.118350341907227396726757197510e+00,
    0.281649658092772603273242802490e+00,
    1.0 / 3.0,
    0.25,
    0.307692307692307692307692307692,
    0.651282051282051282051282051282,
    0.6,
    0.857142857142857142857142857142,
    1.0,
];

const B: [f64; 12] = [
    5.42937341165687622380535766363e-2,
    0.0,
    0.0,
    0.0,
    0.0,
    4.45031289275240888144113950566,
    1.89151789931450038304281599044,
    -5.8012039600105847814672114227,
    3.1116436695781989440891606237e-1,
    -1.52160949662516078556178806805e-1,
    2.01365400804030348374776537501e-1,
    4.47106157277725905176885569043e-2,
];

const BHH: [f64; 3] = [
    0.244094488188976377952755905512,
    0.733846688281611857341361741547,
    0.220588235294117647058823529412e-01,
];
const BHH_INDEX: [usize; 3] = [0, 8, 11];

const ER: [(usize, f64); 8] = [
    (0, 0.1312004499419488073250102996e-01),
    (5, -0.1225156446376204440720569753e+01),
    (6, -0.4957589496572501915214079952e+00),
    (7, 0.1664377182454986536961530415e+01),
    (8, -0.3503288487499736816886487290e+00),
    (9, 0.3341791187130174790297318841e+00),
    (10, 0.8192320648511571246570742613e-01),
    (11, -0.2235530786388629525884427845e-01),
];

// Dense-output-only stages (Hairer's K14, K15, K16), plus the endpoint
// derivative used both as one of their inputs and as a D-matrix column.
const C14: f64 = 0.1;
const C15: f64 = 0.2;
const C16: f64 = 7.0 / 9.0;

// Indices into the 13-long `all_k` built so far (0..11 primary stages,
// 12 the endpoint derivative) at the time each extra stage is evaluated.
const A14_IDX: [usize; 8] = [0, 6, 7, 8, 9, 10, 11, 12];
const A14: [f64; 8] = [
    5.61675022830479523392529579138e-2,
    2.53500210216624811088794765333e-1,
    -2.46239037470802489917441475441e-1,
    -1.24191423263816360469010140626e-1,
    1.5329179827876569731206322685e-1,
    8.20105229563468988491666602057e-3,
    7.56789766054569976138603589584e-3,
    -8.298e-3,
];

const A15_IDX: [usize; 8] = [0, 5, 6, 7, 10, 11, 12, 13];
const A15: [f64; 8] = [
    3.18346481635021405060768473261e-2,
    2.83009096723667755288322961402e-2,
    5.35419883074385676223797384372e-2,
    -5.49237485713909884646569340306e-2,
    -1.08347328697249322858509315662e-4,
    3.82571090835658412954920192323e-4,
    -3.40465008687404560802977114492e-4,
    1.41312443674632500278074618366e-1,
];

const A16_IDX: [usize; 8] = [0, 5, 6, 7, 8, 12, 13, 14];
const A16: [f64; 8] = [
    -4.28896301583791923408573538692e-1,
    -4.69762141536116384314449447206,
    7.68342119606259904184240953878,
    4.06898981839711007970213554331,
    3.56727187455281109270669543021e-1,
    -1.39902416515901462129418009734e-3,
    2.9475147891527723389556272149,
    -9.15095847217987001081870187138,
];

// The dense-output `D` matrix (4 rows), each a literal weight list over
// the 12 columns selected by `D_COLS`; `D_TAIL` holds the extra three
// weights against the interpolation-only stages 14, 15, 16.
const D_COLS: [usize; 9] = [0, 5, 6, 7, 8, 9, 10, 11, 12];

const D4: [f64; 9] = [
    -0.84289382761090128651353491142e+01,
    0.56671495351937776962531783590e+00,
    -0.30689499459498916912797304727e+01,
    0.23846676565120698287728149680e+01,
    0.21170345824450282767155149946e+01,
    -0.87139158377797299206789907490e+00,
    0.22404374302607882758541771650e+01,
    0.63157877876946881815570249290e+00,
    -0.88990336451333310820698117400e-01,
];
const D4_TAIL: [f64; 3] = [
    -0.13780918637249831292162965114e+02,
    0.64293062225249862530029858267e+01,
    0.39076943552495169089289978157e+01,
];

const D5: [f64; 9] = [
    0.10427508642579134603413151009e+02,
    0.24228349177525818288430175319e+03,
    0.16520045171727028198505394887e+03,
    -0.37454675472269020279518312152e+03,
    -0.22113666853125306036270938578e+02,
    0.77334326684722638389603898808e+01,
    -0.30674084731089398182061213626e+02,
    -0.93321305264302278729567221706e+01,
    0.15697238121770843886131091075e+02,
];
const D5_TAIL: [f64; 3] = [
    -0.31139403219565177677282850411e+02,
    -0.93529243588444783865713862664e+01,
    0.35816841486394083752465898086e+01,
];

const D6: [f64; 9] = [
    0.19985053242002433820987653617e+02,
    -0.38703730874935176555105901742e+03,
    -0.18917813819516756882830838328e+03,
    0.52780815920542364900561016686e+03,
    -0.11573902539959630126141871134e+02,
    0.68812326946963000169666922661e+01,
    -0.10006050966910838403183860980e+01,
    0.77771377980534432092869265740e+00,
    -0.27782057523535084065932004339e+01,
];
const D6_TAIL: [f64; 3] = [
    -0.60196695231264120758267380846e+02,
    0.84320405506677161018159903784e+02,
    0.11992291136182789252572114573e+02,
];

const D7: [f64; 9] = [
    -0.25693933462703749198894812963e+02,
    -0.15418974869023643374053993627e+03,
    -0.23152937917604549567536039109e+03,
    0.35763911791061412378285349910e+03,
    0.93405324183624310003907691063e+02,
    -0.37458323136451633156875139351e+02,
    0.10409964950896230045147246184e+03,
    0.29840293426660503123344363579e+02,
    -0.43533456590011143754432175058e+02,
];
const D7_TAIL: [f64; 3] = [
    0.96324553959188282948894638598e+02,
    -0.39177261675615439165231486172e+02,
    -0.14972683625798562581422125276e+03,
];

fn a_rows() -> [&'static [f64]; 12] {
    static A2: [f64; 1] = [0.526001519587677318785587544488e-01];
    static A3: [f64; 2] = [0.197250569845378994544595329183e-01, 0.591751709536136983633785987549e-01];
    static A4: [f64; 3] = [0.295875854768068491816892993775e-01, 0.0, 0.887627564304205475450678981324e-01];
    static A5: [f64; 4] = [
        0.241365134159266685502369798665,
        0.0,
        -0.884549479328286085344864962717,
        0.924834003261792003115737966543,
    ];
    static A6: [f64; 5] = [
        0.37037037037037037037037037037e-1,
        0.0,
        0.0,
        0.170828608729473871279604482173,
        0.125467687566822425016691814123,
    ];
    static A7: [f64; 6] = [
        0.37109375e-1,
        0.0,
        0.0,
        0.170252211019544039314978060272,
        0.602165389804559606850219397283e-1,
        -0.17578125e-1,
    ];
    static A8: [f64; 7] = [
        0.370920001185047927108779319836e-1,
        0.0,
        0.0,
        0.170383925712239993810214054705,
        0.107262030446373284651809199168,
        -0.153194377486244017527936158236e-1,
        0.827378916381402288758473766002e-2,
    ];
    static A9: [f64; 8] = [
        0.624110958716075717114429577812,
        0.0,
        0.0,
        -0.336089262944694129406857109825e1,
        -0.868219346841726006818189891453,
        0.275920996994467083049415600797e2,
        0.201540675504778934086186788979e2,
        -0.434261345098143359435185241757e2,
    ];
    static A10: [f64; 9] = [
        0.477662536438264365890433908527,
        0.0,
        0.0,
        -0.248811461997166764192642586468e1,
        -0.590290826836842996371446475743,
        0.212300514481811942347288949897e2,
        0.152792336328824235832596922938e2,
        -0.332882109689848629194453265587e2,
        -0.203312017085086261358222928593e-1,
    ];
    static A11: [f64; 10] = [
        -0.93714243008598732571704021658,
        0.0,
        0.0,
        0.518637242884406370830023853209e1,
        0.109143734899672957818500254654e1,
        -0.814978701074692612513997267357e1,
        -0.185200656599969598641566180701e2,
        0.227394870993505042818970056734e2,
        0.249360555267965238987089396762e1,
        -0.30467644718982195003823669022e1,
    ];
    static A12: [f64; 11] = [
        0.227331014751653820792359768449e1,
        0.0,
        0.0,
        -0.105344954667372501984066689879e2,
        -0.200087205822486249909675718444e1,
        -0.179589318631187989172765950534e2,
        0.279488845294199600508499808837e2,
        -0.285899827713502369474065508674e1,
        -0.887285693353062954433549289258e1,
        0.123605671757943030647266201528e2,
        0.643392746015763530355970484046,
    ];
    [
        &[],
        &A2,
        &A3,
        &A4,
        &A5,
        &A6,
        &A7,
        &A8,
        &A9,
        &A10,
        &A11,
        &A12,
    ]
}

pub struct Dp853<F> {
    tableau: ButcherTableau<F>,
    bhh: Vec<F>,
    er: Vec<(usize, F)>,
    a14: Vec<F>,
    a15: Vec<F>,
    a16: Vec<F>,
    d4: Vec<F>,
    d5: Vec<F>,
    d6: Vec<F>,
    d7: Vec<F>,
}

impl<F: FieldElement> Dp853<F> {
    pub fn new() -> Self {
        let rows = a_rows();
        let tableau = ButcherTableau::from_f64(false, 8, &C, &rows, &B);
        let bhh = BHH.iter().map(|&v| F::from_f64(v)).collect();
        let er = ER.iter().map(|&(i, v)| (i, F::from_f64(v))).collect();
        let a14 = A14.iter().map(|&v| F::from_f64(v)).collect();
        let a15 = A15.iter().map(|&v| F::from_f64(v)).collect();
        let a16 = A16.iter().map(|&v| F::from_f64(v)).collect();
        let d4 = D4.iter().chain(D4_TAIL.iter()).map(|&v| F::from_f64(v)).collect();
        let d5 = D5.iter().chain(D5_TAIL.iter()).map(|&v| F::from_f64(v)).collect();
        let d6 = D6.iter().chain(D6_TAIL.iter()).map(|&v| F::from_f64(v)).collect();
        let d7 = D7.iter().chain(D7_TAIL.iter()).map(|&v| F::from_f64(v)).collect();
        Self {
            tableau,
            bhh,
            er,
            a14,
            a15,
            a16,
            d4,
            d5,
            d6,
            d7,
        }
    }
}

impl<F: FieldElement> Default for Dp853<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FieldElement> ErkMethod<F> for Dp853<F> {
    fn tableau(&self) -> &ButcherTableau<F> {
        &self.tableau
    }

    fn order(&self) -> usize {
        8
    }

    /// Hairer's two-estimate blend (`dop853.f`'s `ERRI`/`ERR2`): a 5th
    /// order estimate from `b - bhh` and a 3rd order estimate from `er`,
    /// combined as `err5 / sqrt(err5^2 + 0.01 * err3^2)`.
    fn estimate_error(
        &self,
        y_dot_k: &[DVec<F>],
        _y_old: &DVec<F>,
        _y_new: &DVec<F>,
        h: F,
        envelope: &DVec<F>,
    ) -> F {
        let dim = envelope.len();
        let mut err5 = DVec::zeros(dim);
        for (idx, &stage) in BHH_INDEX.iter().enumerate() {
            let weight = self.tableau.b[stage] - self.bhh[idx];
            err5.axpy(h * weight, &y_dot_k[stage]);
        }
        let mut err3 = DVec::zeros(dim);
        for &(stage, weight) in &self.er {
            err3.axpy(h * weight, &y_dot_k[stage]);
        }

        let n5 = err5.component_div(envelope).rms_norm();
        let n3 = err3.component_div(envelope).rms_norm();
        let denom = (n5 * n5 + F::from_f64(0.01) * n3 * n3).sqrt();
        if denom.to_f64() == 0.0 {
            F::zero()
        } else {
            n5 / denom.max(F::from_f64(1e-30))
        }
    }

    /// The endpoint derivative (stage 13, weighted by the propagation
    /// row `b`) plus the three interpolation-only stages K14, K15, K16.
    fn extra_stages(&self) -> Vec<(F, Vec<(usize, F)>)> {
        let endpoint = (
            F::one(),
            self.tableau.b.iter().copied().enumerate().collect::<Vec<_>>(),
        );
        let k14 = (
            F::from_f64(C14),
            A14_IDX.iter().copied().zip(self.a14.iter().copied()).collect(),
        );
        let k15 = (
            F::from_f64(C15),
            A15_IDX.iter().copied().zip(self.a15.iter().copied()).collect(),
        );
        let k16 = (
            F::from_f64(C16),
            A16_IDX.iter().copied().zip(self.a16.iter().copied()).collect(),
        );
        vec![endpoint, k14, k15, k16]
    }

    fn make_dense_output(
        &self,
        y_dot_k: Vec<DVec<F>>,
        y_old: DVec<F>,
        y_new: DVec<F>,
        h: F,
    ) -> Box<dyn DenseOutput<F>> {
        let dim = y_old.len();
        let endpoint = &y_dot_k[12];

        let y_diff = &y_new - &y_old;
        let v0 = y_diff.scale(F::one() / h);

        let mut v1 = y_dot_k[0].clone();
        v1.axpy(-F::one(), &v0);

        let mut v2 = v0.clone();
        v2.axpy(-F::one(), &v1);
        v2.axpy(-F::one(), endpoint);

        let d_dot = |weights: &[F]| -> DVec<F> {
            let mut out = DVec::zeros(dim);
            for (col, &w) in D_COLS.iter().zip(weights[..9].iter()) {
                out.axpy(w, &y_dot_k[*col]);
            }
            out.axpy(weights[9], &y_dot_k[13]);
            out.axpy(weights[10], &y_dot_k[14]);
            out.axpy(weights[11], &y_dot_k[15]);
            out
        };

        let v3 = d_dot(&self.d4);
        let v4 = d_dot(&self.d5);
        let v5 = d_dot(&self.d6);
        let v6 = d_dot(&self.d7);

        Box::new(Dp853DenseOutput {
            v: [v0, v1, v2, v3, v4, v5, v6],
        })
    }
}

/// Degree-7 nested polynomial dense output (Hairer's `CONTD8`):
/// `y(theta) = y_prev + theta*h*(v0 + eta*(v1 + theta*(v2 + eta*(v3 +
/// theta*(v4 + eta*(v5 + theta*v6))))))`, `eta = 1 - theta`. The
/// derivative is obtained by propagating a `(value, d/dtheta)` pair
/// through the same recurrence and dividing by `h` at the end.
struct Dp853DenseOutput<F> {
    v: [DVec<F>; 7],
}

impl<F: FieldElement> Dp853DenseOutput<F> {
    fn horner(&self, theta: F, eta: F) -> (DVec<F>, DVec<F>) {
        let mut val = self.v[6].clone();
        let mut der = DVec::zeros(val.len());

        // v5 + theta * (v6)
        let mut new_der = val.clone();
        new_der.axpy(theta, &der);
        let mut new_val = self.v[5].clone();
        new_val.axpy(theta, &val);
        val = new_val;
        der = new_der;

        // v4 + eta * (...)
        let mut new_der = val.scale(-F::one());
        new_der.axpy(eta, &der);
        let mut new_val = self.v[4].clone();
        new_val.axpy(eta, &val);
        val = new_val;
        der = new_der;

        // v3 + theta * (...)
        let mut new_der = val.clone();
        new_der.axpy(theta, &der);
        let mut new_val = self.v[3].clone();
        new_val.axpy(theta, &val);
        val = new_val;
        der = new_der;

        // v2 + eta * (...)
        let mut new_der = val.scale(-F::one());
        new_der.axpy(eta, &der);
        let mut new_val = self.v[2].clone();
        new_val.axpy(eta, &val);
        val = new_val;
        der = new_der;

        // v1 + theta * (...)
        let mut new_der = val.clone();
        new_der.axpy(theta, &der);
        let mut new_val = self.v[1].clone();
        new_val.axpy(theta, &val);
        val = new_val;
        der = new_der;

        // v0 + eta * (...)
        let mut new_der = val.scale(-F::one());
        new_der.axpy(eta, &der);
        let mut new_val = self.v[0].clone();
        new_val.axpy(eta, &val);
        val = new_val;
        der = new_der;

        (val, der)
    }
}

impl<F: FieldElement> DenseOutput<F> for Dp853DenseOutput<F> {
    fn evaluate_state(
        &self,
        previous_state: &DVec<F>,
        _current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F> {
        let eta = F::one() - theta;
        let (p, _) = self.horner(theta, eta);
        let mut out = previous_state.clone();
        out.axpy(theta * h, &p);
        out
    }

    fn evaluate_derivative(
        &self,
        _previous_state: &DVec<F>,
        _current_state: &DVec<F>,
        theta: F,
        _h: F,
    ) -> DVec<F> {
        let eta = F::one() - theta;
        let (p, p_prime) = self.horner(theta, eta);
        let mut out = p;
        out.axpy(theta, &p_prime);
        out
    }

    fn finalize(&mut self, _t_previous: F, _previous_state: &DVec<F>, _current_state: &DVec<F>, _h: F) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_node_matches_the_closed_form_constant() {
        let expected = (12.0 - 2.0 * 6.0_f64.sqrt()) / 135.0;
        assert!((C[1] - expected).abs() < 1e-15);
    }

    #[test]
    fn tableau_rows_sum_to_their_node() {
        let method: Dp853<f64> = Dp853::new();
        let tableau = method.tableau();
        for k in 1..tableau.stages {
            let row_sum: f64 = tableau.a[k].iter().sum();
            assert!((row_sum - tableau.c[k]).abs() < 1e-9, "row {k}: {row_sum} vs {}", tableau.c[k]);
        }
    }

    #[test]
    fn propagation_weights_sum_to_one() {
        let sum: f64 = B.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn extra_stage_nodes_match_the_published_constants() {
        let method: Dp853<f64> = Dp853::new();
        let stages = method.extra_stages();
        assert_eq!(stages.len(), 4);
        assert!((stages[0].0 - 1.0).abs() < 1e-15);
        assert!((stages[1].0 - C14).abs() < 1e-15);
        assert!((stages[2].0 - C15).abs() < 1e-15);
        assert!((stages[3].0 - C16).abs() < 1e-15);
    }

    /// At theta=0 the polynomial must reproduce the previous state and
    /// at theta=1 the newly propagated state, regardless of what the
    /// interior v-vectors are (a basic sanity check independent of the
    /// literal D-matrix digits).
    #[test]
    fn dense_output_endpoints_match_the_step_boundary() {
        let v0 = DVec::from_vec(vec![2.0]);
        let zero = DVec::from_vec(vec![0.0]);
        let dense = Dp853DenseOutput {
            v: [v0, zero.clone(), zero.clone(), zero.clone(), zero.clone(), zero.clone(), zero],
        };
        let prev = DVec::from_vec(vec![1.0]);
        let curr = DVec::from_vec(vec![3.0]);
        let h = 1.0;
        let at_start = dense.evaluate_state(&prev, &curr, 0.0, h);
        assert!((at_start[0] - prev[0]).abs() < 1e-12);
        let at_end = dense.evaluate_state(&prev, &curr, 1.0, h);
        assert!((at_end[0] - curr[0]).abs() < 1e-12, "{}", at_end[0]);
    }

    struct ExponentialDecay;
    impl crate::ode::problem::OdeProblem<f64> for ExponentialDecay {
        fn dim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &DVec<f64>, dy: &mut DVec<f64>) {
            dy[0] = -3.0 * y[0];
        }
    }

    #[test]
    fn adaptive_integration_of_exponential_decay_matches_closed_form() {
        use crate::ode::controller::StepController;
        use crate::ode::handler::NoOpStepHandler;
        use crate::ode::problem::{OdeSolverProblem, Tolerance};
        use crate::ode::rk::engine::EmbeddedRungeKutta;

        let controller = StepController::new(1e-10, 0.2);
        let mut engine = EmbeddedRungeKutta::new(Dp853::<f64>::new(), controller);
        let solver_problem = OdeSolverProblem::<f64>::new(
            1,
            &[],
            Tolerance::Scalar { abs: 1e-11, rel: 1e-11 },
        )
        .unwrap();
        let mut handler = NoOpStepHandler;
        let (t_final, y_final) = engine
            .integrate(
                &ExponentialDecay,
                &solver_problem,
                0.0,
                &DVec::from_vec(vec![1.0]),
                2.0,
                None,
                &mut handler,
            )
            .unwrap();
        assert!((t_final - 2.0).abs() < 1e-9);
        let expected = (-6.0_f64).exp();
        assert!((y_final[0] - expected).abs() < 1e-6, "{} vs {}", y_final[0], expected);
    }
}
